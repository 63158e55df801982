use chrono::NaiveDate;

use settlement_core::AggregateRoot;
use settlement_expense::{RecordStatus, SettlementRecord};

/// Criteria for `RecordStore::list`. The default matches every live record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    project_name: Option<String>,
    issued_from: Option<NaiveDate>,
    issued_to: Option<NaiveDate>,
    status: Option<RecordStatus>,
    include_deleted: bool,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring of the project name.
    pub fn project_name(mut self, needle: impl Into<String>) -> Self {
        let needle = needle.into();
        self.project_name = if needle.trim().is_empty() {
            None
        } else {
            Some(needle.to_lowercase())
        };
        self
    }

    /// Inclusive issue-date range; either end may be open.
    pub fn issued_between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.issued_from = from;
        self.issued_to = to;
        self
    }

    pub fn status(mut self, status: RecordStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn include_deleted(mut self) -> Self {
        self.include_deleted = true;
        self
    }

    pub fn matches(&self, record: &SettlementRecord) -> bool {
        let status = record.status();
        if status == RecordStatus::Deleted
            && !self.include_deleted
            && self.status != Some(RecordStatus::Deleted)
        {
            return false;
        }
        if self.status.is_some_and(|s| s != status) {
            return false;
        }
        if let Some(needle) = &self.project_name {
            if !record.project_name().to_lowercase().contains(needle.as_str()) {
                return false;
            }
        }
        let issued = record.issue_date();
        if self.issued_from.is_some_and(|from| issued < from) {
            return false;
        }
        if self.issued_to.is_some_and(|to| issued > to) {
            return false;
        }
        true
    }
}

/// Newest issue date first, then id ascending.
pub(crate) fn sort_for_listing(records: &mut [SettlementRecord]) {
    records.sort_by(|a, b| {
        b.issue_date()
            .cmp(&a.issue_date())
            .then_with(|| a.id().cmp(b.id()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use settlement_core::RecordId;
    use settlement_expense::{RecordHeader, WorkLocation};

    fn record(owner: &str, project: &str, day: u32) -> SettlementRecord {
        let at = Utc.with_ymd_and_hms(2026, 10, day, 9, 0, 0).unwrap();
        let id = RecordId::generate(RecordId::EXPENSE_PREFIX, owner, at).unwrap();
        SettlementRecord::draft(
            id,
            RecordHeader {
                project_name: project.to_string(),
                issued_by: owner.to_string(),
                issue_date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
                work_location: WorkLocation::Domestic,
                work_country: None,
                fund_amount: dec!(0),
                receive_date: NaiveDate::from_ymd_opt(2026, 10, day).unwrap(),
            },
        )
    }

    #[test]
    fn project_name_match_ignores_case() {
        let r = record("alice", "Bangkok Office Fit-out", 5);
        assert!(RecordFilter::new().project_name("office").matches(&r));
        assert!(RecordFilter::new().project_name("BANGKOK").matches(&r));
        assert!(!RecordFilter::new().project_name("hanoi").matches(&r));
        assert!(RecordFilter::new().project_name("  ").matches(&r));
    }

    #[test]
    fn date_range_is_inclusive() {
        let r = record("alice", "P", 10);
        let d = |day| NaiveDate::from_ymd_opt(2026, 10, day);
        assert!(RecordFilter::new().issued_between(d(10), d(10)).matches(&r));
        assert!(RecordFilter::new().issued_between(d(1), None).matches(&r));
        assert!(!RecordFilter::new().issued_between(d(11), None).matches(&r));
        assert!(!RecordFilter::new().issued_between(None, d(9)).matches(&r));
    }

    #[test]
    fn deleted_records_are_hidden_by_default() {
        let mut r = record("alice", "P", 10);
        r.mark_deleted().unwrap();
        assert!(!RecordFilter::new().matches(&r));
        assert!(RecordFilter::new().include_deleted().matches(&r));
        assert!(RecordFilter::new().status(RecordStatus::Deleted).matches(&r));
        assert!(!RecordFilter::new().status(RecordStatus::Draft).include_deleted().matches(&r));
    }

    #[test]
    fn listing_order_is_newest_first_then_id() {
        let mut records = vec![
            record("bob", "P", 3),
            record("carol", "P", 7),
            record("alice", "P", 7),
        ];
        sort_for_listing(&mut records);
        let ids: Vec<_> = records.iter().map(|r| r.id().as_str().to_string()).collect();
        assert_eq!(
            ids,
            [
                "EXP-alice-2026-10-07-090000",
                "EXP-carol-2026-10-07-090000",
                "EXP-bob-2026-10-03-090000",
            ]
        );
    }
}
