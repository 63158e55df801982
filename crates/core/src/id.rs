//! Record identifiers.
//!
//! Ids read `<Prefix>-<Owner>-<YYYY>-<MM>-<DD>-<hhmmss>`, stamped in UTC to the
//! second, e.g. `EXP-alice-2026-10-19-091500`. The timestamp is advisory; the
//! record store is what guarantees uniqueness.

use core::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H%M%S";

/// Identifier of a settlement record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Prefix used by the expense module.
    pub const EXPENSE_PREFIX: &'static str = "EXP";

    /// Build an id for `owner` at `at` (truncated to the second).
    pub fn generate(prefix: &str, owner: &str, at: DateTime<Utc>) -> DomainResult<Self> {
        validate_prefix(prefix)?;
        validate_owner(owner)?;
        Ok(Self(format!(
            "{prefix}-{owner}-{}",
            at.format(TIMESTAMP_FORMAT)
        )))
    }

    /// Expense-module id for `owner` stamped now.
    pub fn new_expense(owner: &str) -> DomainResult<Self> {
        Self::generate(Self::EXPENSE_PREFIX, owner, Utc::now())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn prefix(&self) -> &str {
        self.parts().0
    }

    pub fn owner(&self) -> &str {
        self.parts().1
    }

    /// UTC timestamp embedded in the id.
    pub fn timestamp(&self) -> NaiveDateTime {
        // Validated on construction.
        NaiveDateTime::parse_from_str(self.parts().2, TIMESTAMP_FORMAT)
            .unwrap_or_default()
    }

    fn parts(&self) -> (&str, &str, &str) {
        split(&self.0).unwrap_or((&self.0, "", ""))
    }
}

/// Splits into `(prefix, owner, timestamp)`; the owner may itself contain `-`.
fn split(s: &str) -> Option<(&str, &str, &str)> {
    // The timestamp is the trailing 17 bytes: YYYY-MM-DD-hhmmss.
    const TS_LEN: usize = 17;
    let cut = s.len().checked_sub(TS_LEN)?;
    let head = s.get(..cut)?.strip_suffix('-')?;
    let ts = s.get(cut..)?;
    let (prefix, owner) = head.split_once('-')?;
    Some((prefix, owner, ts))
}

fn validate_prefix(prefix: &str) -> DomainResult<()> {
    if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::invalid_id(format!(
            "prefix must be non-empty ASCII alphanumeric, got '{prefix}'"
        )));
    }
    Ok(())
}

fn validate_owner(owner: &str) -> DomainResult<()> {
    if owner.is_empty() || owner.chars().any(char::is_whitespace) {
        return Err(DomainError::invalid_id(format!(
            "owner must be non-empty without whitespace, got '{owner}'"
        )));
    }
    Ok(())
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix, owner, ts) =
            split(s).ok_or_else(|| DomainError::invalid_id(format!("RecordId: malformed '{s}'")))?;
        validate_prefix(prefix)?;
        validate_owner(owner)?;
        NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
            .map_err(|e| DomainError::invalid_id(format!("RecordId: {e} in '{s}'")))?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for RecordId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(value: RecordId) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap()
    }

    #[test]
    fn generate_uses_expected_format() {
        let id = RecordId::generate("EXP", "alice", at()).unwrap();
        assert_eq!(id.as_str(), "EXP-alice-2026-10-19-091500");
        assert_eq!(id.prefix(), "EXP");
        assert_eq!(id.owner(), "alice");
        assert_eq!(id.timestamp(), at().naive_utc());
    }

    #[test]
    fn parse_accepts_owner_with_dashes() {
        let id: RecordId = "EXP-mary-jane-2025-01-02-235959".parse().unwrap();
        assert_eq!(id.prefix(), "EXP");
        assert_eq!(id.owner(), "mary-jane");
    }

    #[test]
    fn parse_rejects_malformed_ids() {
        for bad in [
            "",
            "EXP",
            "EXP-alice",
            "EXP--2025-01-02-235959",
            "EXP-alice-2025-13-02-235959",
            "EXP-alice-2025-01-02-2359",
            "E X-alice-2025-01-02-235959",
        ] {
            assert!(
                matches!(bad.parse::<RecordId>(), Err(DomainError::InvalidId(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn generate_rejects_blank_owner() {
        assert!(RecordId::generate("EXP", "", at()).is_err());
        assert!(RecordId::generate("EXP", "a b", at()).is_err());
    }

    #[test]
    fn string_conversion_validates() {
        let id = RecordId::generate("EXP", "bob", at()).unwrap();
        let raw = String::from(id.clone());
        assert_eq!(raw, "EXP-bob-2026-10-19-091500");
        assert_eq!(RecordId::try_from(raw).unwrap(), id);
        assert!(RecordId::try_from("nonsense".to_string()).is_err());
    }

    #[test]
    fn ids_order_by_timestamp_for_same_owner() {
        let earlier = RecordId::generate("EXP", "alice", at()).unwrap();
        let later = RecordId::generate("EXP", "alice", at() + chrono::Duration::seconds(1)).unwrap();
        assert!(earlier < later);
    }
}
