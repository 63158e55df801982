use std::sync::Arc;

use thiserror::Error;

use settlement_core::{DomainError, ExpectedVersion, RecordId};
use settlement_expense::SettlementRecord;

use super::filter::RecordFilter;

/// Record store operation error.
///
/// These are infrastructure errors (storage, concurrency) as opposed to the
/// domain errors carried in `Domain`.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency check failed. Reload and retry.
    #[error("record {id} was modified concurrently: expected version {expected}, found {actual}")]
    Conflict {
        id: RecordId,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// Another process kept replacing the document while this write was
    /// being prepared. Nothing was written; retry.
    #[error("record store {0} is being written by another process")]
    Contended(String),

    /// `create` with an id that already exists. Regenerate the id.
    #[error("record {0} already exists")]
    DuplicateId(RecordId),

    #[error("record {0} not found")]
    NotFound(RecordId),

    /// The write would break a record lifecycle rule.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The storage medium failed. The previous document is left intact.
    #[error("storage i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The stored document cannot be trusted (unparseable, duplicate ids, poisoned lock).
    #[error("corrupt record store: {0}")]
    Corrupt(String),
}

/// Durable collection of settlement records with optimistic concurrency.
///
/// Versions are assigned by the store: `1` on create, `+1` on every write.
pub trait RecordStore: Send + Sync {
    /// Store a new record at version 1. The collection is unchanged on error.
    fn create(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError>;

    fn load(&self, id: &RecordId) -> Result<SettlementRecord, StoreError>;

    /// Replace a record if `expected` matches the stored version; returns the
    /// record as stored.
    fn save(
        &self,
        record: SettlementRecord,
        expected: ExpectedVersion,
    ) -> Result<SettlementRecord, StoreError>;

    /// Soft delete: mark the record `Deleted`.
    fn delete(&self, id: &RecordId) -> Result<SettlementRecord, StoreError>;

    /// Remove the record from the collection entirely.
    fn purge(&self, id: &RecordId) -> Result<(), StoreError>;

    fn list(&self, filter: &RecordFilter) -> Result<Vec<SettlementRecord>, StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn create(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError> {
        (**self).create(record)
    }

    fn load(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        (**self).load(id)
    }

    fn save(
        &self,
        record: SettlementRecord,
        expected: ExpectedVersion,
    ) -> Result<SettlementRecord, StoreError> {
        (**self).save(record, expected)
    }

    fn delete(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        (**self).delete(id)
    }

    fn purge(&self, id: &RecordId) -> Result<(), StoreError> {
        (**self).purge(id)
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<SettlementRecord>, StoreError> {
        (**self).list(filter)
    }
}
