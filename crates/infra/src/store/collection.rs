use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use settlement_core::{AggregateRoot, DomainError, ExpectedVersion, RecordId};
use settlement_expense::{RecordStatus, SettlementRecord};

use super::filter::{RecordFilter, sort_for_listing};
use super::r#trait::StoreError;

/// The persisted document: `{"revision": n, "forms": [...]}`.
///
/// `revision` counts whole-document writes; the file store uses it to detect
/// writers in other processes. Documents without it start at 0.
///
/// Both stores apply writes through these methods, so they share one set of
/// rules. Every method checks before it mutates; on error the collection is
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCollection {
    #[serde(default)]
    revision: u64,
    #[serde(default)]
    forms: Vec<SettlementRecord>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set_revision(&mut self, revision: u64) {
        self.revision = revision;
    }

    /// Reject documents that break the uniqueness invariant.
    pub fn check_integrity(&self) -> Result<(), StoreError> {
        let mut seen = HashSet::with_capacity(self.forms.len());
        for record in &self.forms {
            if !seen.insert(record.id()) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate record id {}",
                    record.id()
                )));
            }
        }
        Ok(())
    }

    fn position(&self, id: &RecordId) -> Option<usize> {
        self.forms.iter().position(|r| r.id() == id)
    }

    fn stored(&self, id: &RecordId) -> Result<usize, StoreError> {
        self.position(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    pub fn get(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        let idx = self.stored(id)?;
        Ok(self.forms[idx].clone())
    }

    pub fn create(&mut self, mut record: SettlementRecord) -> Result<SettlementRecord, StoreError> {
        if self.position(record.id()).is_some() {
            return Err(StoreError::DuplicateId(record.id().clone()));
        }
        if record.status() == RecordStatus::Deleted {
            return Err(DomainError::invariant("a deleted record cannot be created").into());
        }
        record.set_version(1);
        self.forms.push(record.clone());
        Ok(record)
    }

    pub fn save(
        &mut self,
        mut record: SettlementRecord,
        expected: ExpectedVersion,
    ) -> Result<SettlementRecord, StoreError> {
        let idx = self.stored(record.id())?;
        let current = &self.forms[idx];
        let actual = current.version();

        if !expected.matches(actual) {
            return Err(StoreError::Conflict {
                id: record.id().clone(),
                expected,
                actual,
            });
        }
        check_transition(current, &record)?;

        record.set_version(actual + 1);
        self.forms[idx] = record.clone();
        Ok(record)
    }

    pub fn delete(&mut self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        let idx = self.stored(id)?;
        let mut record = self.forms[idx].clone();
        record.mark_deleted()?;
        record.set_version(record.version() + 1);
        self.forms[idx] = record.clone();
        Ok(record)
    }

    pub fn purge(&mut self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        let idx = self.stored(id)?;
        Ok(self.forms.remove(idx))
    }

    pub fn list(&self, filter: &RecordFilter) -> Vec<SettlementRecord> {
        let mut records: Vec<_> = self
            .forms
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        sort_for_listing(&mut records);
        records
    }
}

/// Lifecycle rules a store re-checks on every save.
fn check_transition(stored: &SettlementRecord, next: &SettlementRecord) -> Result<(), DomainError> {
    use RecordStatus::*;

    check_history(stored, next)?;
    let reopened = next.history().len() > stored.history().len();

    match (stored.status(), next.status()) {
        (Deleted, _) => Err(DomainError::invariant(format!(
            "record {} is deleted and cannot be saved",
            stored.id()
        ))),
        (_, Deleted) => Err(DomainError::invariant(format!(
            "record {} must be deleted through the store",
            stored.id()
        ))),
        (Finalized, Finalized) if !stored.same_content(next) => Err(DomainError::invariant(format!(
            "record {} is finalized and read-only",
            stored.id()
        ))),
        (Finalized, Draft) if !reopened => Err(DomainError::invariant(format!(
            "record {} must be reopened before it is edited",
            stored.id()
        ))),
        (Finalized, Draft) => Ok(()),
        _ if reopened => Err(DomainError::invariant(format!(
            "audit snapshots of {} are only added when a finalized record is reopened",
            stored.id()
        ))),
        _ => Ok(()),
    }
}

/// Stored snapshots are kept verbatim; a save may append at most one, and it
/// must capture the stored record.
fn check_history(stored: &SettlementRecord, next: &SettlementRecord) -> Result<(), DomainError> {
    let rewritten = || {
        DomainError::invariant(format!("audit history of {} cannot be rewritten", stored.id()))
    };

    if !next.history().starts_with(stored.history()) {
        return Err(rewritten());
    }
    match &next.history()[stored.history().len()..] {
        [] => Ok(()),
        [added] => {
            let snapshot = &added.record;
            let captures_stored = snapshot.id() == stored.id()
                && snapshot.status() == RecordStatus::Finalized
                && snapshot.header() == stored.header()
                && snapshot.rates() == stored.rates()
                && snapshot.items() == stored.items()
                && snapshot.history().is_empty();
            if captures_stored { Ok(()) } else { Err(rewritten()) }
        }
        _ => Err(DomainError::invariant(format!(
            "record {} can gain only one audit snapshot per save",
            stored.id()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use settlement_expense::{
        ExpenseSettings, LineItem, ReceiptType, RecordHeader, SettlementCalculator, WorkLocation,
    };

    fn record(second: u32) -> SettlementRecord {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, second).unwrap();
        let id = RecordId::generate(RecordId::EXPENSE_PREFIX, "alice", at).unwrap();
        let mut r = SettlementRecord::draft(
            id,
            RecordHeader {
                project_name: "Chiang Mai install".to_string(),
                issued_by: "alice".to_string(),
                issue_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                work_location: WorkLocation::Domestic,
                work_country: None,
                fund_amount: dec!(5000),
                receive_date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            },
        );
        r.add_item(LineItem {
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            detail: "Diesel".to_string(),
            vendor: "PTT".to_string(),
            category: "Fuel".to_string(),
            amount: dec!(1500),
            currency: "THB".parse().unwrap(),
            receipt_type: ReceiptType::Official,
        })
        .unwrap();
        r
    }

    fn finalized(collection: &mut RecordCollection) -> SettlementRecord {
        let settings = ExpenseSettings::default();
        let mut r = collection.create(record(0)).unwrap();
        SettlementCalculator::new(&settings).finalize(&mut r).unwrap();
        collection.save(r, ExpectedVersion::Exact(1)).unwrap()
    }

    #[test]
    fn create_assigns_version_one_and_rejects_duplicates() {
        let mut c = RecordCollection::new();
        let created = c.create(record(0)).unwrap();
        assert_eq!(created.version(), 1);

        let before = c.clone();
        let mut dup = record(0);
        dup.set_rates(settlement_expense::ExchangeRates::new(dec!(36))).unwrap();
        assert!(matches!(c.create(dup), Err(StoreError::DuplicateId(_))));
        assert_eq!(c, before);
    }

    #[test]
    fn stale_save_conflicts() {
        let mut c = RecordCollection::new();
        let created = c.create(record(0)).unwrap();

        let first = c.save(created.clone(), ExpectedVersion::of(&created)).unwrap();
        assert_eq!(first.version(), 2);

        match c.save(created, ExpectedVersion::Exact(1)) {
            Err(StoreError::Conflict { expected, actual, .. }) => {
                assert_eq!(expected, ExpectedVersion::Exact(1));
                assert_eq!(actual, 2);
            }
            other => panic!("Expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn finalized_content_is_read_only() {
        let mut c = RecordCollection::new();
        let stored = finalized(&mut c);
        assert_eq!(stored.version(), 2);

        // re-saving identical content is allowed
        let again = c.save(stored.clone(), ExpectedVersion::Exact(2)).unwrap();
        assert_eq!(again.version(), 3);

        // a draft with the same history is an edit that skipped reopen
        let mut bypass = record(0);
        bypass.add_item(again.items()[0].clone()).unwrap();
        let err = c.save(bypass, ExpectedVersion::Exact(3)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn reopened_record_can_be_saved_as_draft() {
        let mut c = RecordCollection::new();
        let mut stored = finalized(&mut c);
        stored.reopen("bob", Utc::now()).unwrap();
        let saved = c.save(stored, ExpectedVersion::Exact(2)).unwrap();
        assert!(saved.is_draft());
        assert_eq!(saved.history().len(), 1);
    }

    fn reopened(c: &mut RecordCollection) -> SettlementRecord {
        let mut stored = finalized(c);
        stored.reopen("bob", Utc::now()).unwrap();
        c.save(stored, ExpectedVersion::Exact(2)).unwrap()
    }

    #[test]
    fn stored_snapshots_cannot_be_edited() {
        let mut c = RecordCollection::new();
        let draft = reopened(&mut c);

        let mut json = serde_json::to_value(&draft).unwrap();
        json["history"][0]["reopenedBy"] = "nobody".into();
        json["history"][0]["record"]["items"][0]["amount"] = "1".into();
        let forged: SettlementRecord = serde_json::from_value(json).unwrap();
        assert_eq!(forged.history().len(), draft.history().len());

        let err = c.save(forged, ExpectedVersion::Exact(3)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
        let kept = c.get(draft.id()).unwrap();
        assert_eq!(kept.history()[0].reopened_by, "bob");
        assert_eq!(kept.history()[0].record.items()[0].amount, dec!(1500));
    }

    #[test]
    fn snapshots_are_only_added_by_reopening() {
        let mut c = RecordCollection::new();
        let draft = reopened(&mut c);

        // a draft cannot grow its own history
        let mut json = serde_json::to_value(&draft).unwrap();
        let first = json["history"][0].clone();
        json["history"].as_array_mut().unwrap().push(first);
        let padded: SettlementRecord = serde_json::from_value(json).unwrap();
        let err = c.save(padded, ExpectedVersion::Exact(3)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));

        // reopening twice in one save is rejected
        let mut twice = RecordCollection::new();
        let mut stored = finalized(&mut twice);
        stored.reopen("bob", Utc::now()).unwrap();
        SettlementCalculator::new(&ExpenseSettings::default())
            .finalize(&mut stored)
            .unwrap();
        stored.reopen("carol", Utc::now()).unwrap();
        let err = twice.save(stored, ExpectedVersion::Exact(2)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn new_snapshot_must_capture_the_stored_record() {
        let mut c = RecordCollection::new();
        let stored = finalized(&mut c);

        let mut json = serde_json::to_value(&stored).unwrap();
        json["status"] = "draft".into();
        let mut snapshot = serde_json::to_value(&stored).unwrap();
        snapshot["fundAmount"] = "999999".into();
        json["history"] = serde_json::json!([{
            "reopenedAt": "2026-10-19T10:00:00Z",
            "reopenedBy": "bob",
            "record": snapshot,
        }]);
        let forged: SettlementRecord = serde_json::from_value(json).unwrap();

        let err = c.save(forged, ExpectedVersion::Exact(2)).unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));
        assert_eq!(c.get(stored.id()).unwrap(), stored);
    }

    #[test]
    fn deleted_records_cannot_be_saved() {
        let mut c = RecordCollection::new();
        let created = c.create(record(0)).unwrap();
        let deleted = c.delete(created.id()).unwrap();
        assert_eq!(deleted.status(), RecordStatus::Deleted);
        assert_eq!(deleted.version(), 2);

        let err = c.save(created, ExpectedVersion::Any).unwrap_err();
        assert!(matches!(err, StoreError::Domain(_)));
        assert!(matches!(c.delete(deleted.id()), Err(StoreError::Domain(_))));
    }

    #[test]
    fn purge_removes_the_record() {
        let mut c = RecordCollection::new();
        let created = c.create(record(0)).unwrap();
        c.create(record(1)).unwrap();
        c.purge(created.id()).unwrap();
        assert_eq!(c.len(), 1);
        assert!(matches!(c.get(created.id()), Err(StoreError::NotFound(_))));
        assert!(matches!(c.purge(created.id()), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn duplicate_ids_in_a_document_are_corrupt() {
        let mut c = RecordCollection::new();
        c.create(record(0)).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        let forms = json["forms"].as_array().unwrap();
        let doubled = serde_json::json!({ "forms": [forms[0], forms[0]] });
        let loaded: RecordCollection = serde_json::from_value(doubled).unwrap();
        assert!(matches!(loaded.check_integrity(), Err(StoreError::Corrupt(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Each session saves from the version it last loaded; a save from a
        /// stale base conflicts and the session reloads.
        #[test]
        fn versions_only_grow_and_stale_saves_conflict(
            steps in proptest::collection::vec((0usize..3, any::<bool>()), 1..40),
        ) {
            let mut c = RecordCollection::new();
            let created = c.create(record(0)).unwrap();
            let mut sessions = vec![created.clone(), created.clone(), created];
            let mut stored_version = 1;

            for (session, reload_first) in steps {
                if reload_first {
                    sessions[session] = c.get(sessions[session].id()).unwrap();
                }
                let base = sessions[session].clone();
                let mut edited = base.clone();
                edited.set_rates(settlement_expense::ExchangeRates::new(dec!(35))).unwrap();

                match c.save(edited, ExpectedVersion::of(&base)) {
                    Ok(saved) => {
                        prop_assert_eq!(base.version(), stored_version);
                        prop_assert_eq!(saved.version(), stored_version + 1);
                        stored_version = saved.version();
                        sessions[session] = saved;
                    }
                    Err(StoreError::Conflict { actual, .. }) => {
                        prop_assert!(base.version() < stored_version);
                        prop_assert_eq!(actual, stored_version);
                        sessions[session] = c.get(base.id()).unwrap();
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {}", other),
                }
                prop_assert_eq!(c.get(sessions[0].id()).unwrap().version(), stored_version);
            }
        }
    }
}
