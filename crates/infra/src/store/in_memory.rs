use std::sync::RwLock;

use settlement_core::{ExpectedVersion, RecordId};
use settlement_expense::SettlementRecord;

use super::collection::RecordCollection;
use super::filter::RecordFilter;
use super::r#trait::{RecordStore, StoreError};

/// In-memory record store.
///
/// Intended for tests/dev. Same rules as the file store, no durability.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    collection: RwLock<RecordCollection>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection (e.g. a fixture document).
    pub fn with_collection(collection: RecordCollection) -> Result<Self, StoreError> {
        collection.check_integrity()?;
        Ok(Self {
            collection: RwLock::new(collection),
        })
    }

    fn read<T>(&self, f: impl FnOnce(&RecordCollection) -> T) -> Result<T, StoreError> {
        let guard = self
            .collection
            .read()
            .map_err(|_| StoreError::Corrupt("lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut RecordCollection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut guard = self
            .collection
            .write()
            .map_err(|_| StoreError::Corrupt("lock poisoned".to_string()))?;
        f(&mut guard)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError> {
        self.write(|c| c.create(record))
    }

    fn load(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        self.read(|c| c.get(id))?
    }

    fn save(
        &self,
        record: SettlementRecord,
        expected: ExpectedVersion,
    ) -> Result<SettlementRecord, StoreError> {
        self.write(|c| c.save(record, expected))
    }

    fn delete(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        self.write(|c| c.delete(id))
    }

    fn purge(&self, id: &RecordId) -> Result<(), StoreError> {
        self.write(|c| c.purge(id).map(|_| ()))
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<SettlementRecord>, StoreError> {
        self.read(|c| c.list(filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use settlement_core::AggregateRoot;
    use settlement_expense::{RecordHeader, RecordStatus, WorkLocation};
    use std::sync::Arc;
    use std::thread;

    fn record(owner: &str) -> SettlementRecord {
        let at = Utc.with_ymd_and_hms(2026, 10, 19, 9, 15, 0).unwrap();
        let id = RecordId::generate(RecordId::EXPENSE_PREFIX, owner, at).unwrap();
        SettlementRecord::draft(
            id,
            RecordHeader {
                project_name: format!("{owner}'s trip"),
                issued_by: owner.to_string(),
                issue_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                work_location: WorkLocation::Domestic,
                work_country: None,
                fund_amount: dec!(100),
                receive_date: NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            },
        )
    }

    #[test]
    fn delete_hides_record_from_default_listing() {
        let store = InMemoryRecordStore::new();
        let a = store.create(record("alice")).unwrap();
        store.create(record("bob")).unwrap();

        store.delete(a.id()).unwrap();
        assert_eq!(store.list(&RecordFilter::new()).unwrap().len(), 1);
        let all = store.list(&RecordFilter::new().include_deleted()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.load(a.id()).unwrap().status(), RecordStatus::Deleted);
    }

    #[test]
    fn concurrent_saves_from_same_base_admit_exactly_one() {
        let store = Arc::new(InMemoryRecordStore::new());
        let base = store.create(record("alice")).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let copy = base.clone();
                thread::spawn(move || store.save(copy, ExpectedVersion::Exact(1)))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::Conflict { .. })))
            .count();
        assert_eq!(ok, 1);
        assert_eq!(conflicts, 7);
        assert_eq!(store.load(base.id()).unwrap().version(), 2);
    }
}
