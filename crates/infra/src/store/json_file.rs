use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use settlement_core::{AggregateRoot, ExpectedVersion, RecordId};
use settlement_expense::SettlementRecord;

use super::collection::RecordCollection;
use super::filter::RecordFilter;
use super::r#trait::{RecordStore, StoreError};
use crate::atomic;

const CLAIM_ATTEMPTS: u32 = 16;

/// A claim this old on an unchanged document belongs to a writer that died
/// between claiming and renaming.
const STALE_CLAIM: Duration = Duration::from_secs(30);

/// Record store backed by a single JSON document (`{"revision": n, "forms": [...]}`).
///
/// Every write re-reads the document, applies the change and atomically
/// replaces the file, so readers always see either the old or the new
/// document. All handles on the same file in this process share one writer
/// lock. Writers in other processes are ordered by the document revision:
/// a writer must claim revision `n + 1` (a marker file created without
/// clobbering) before replacing revision `n`, and re-applies its change on
/// the newer document when the claim is taken, so record versions are
/// checked against what was actually stored.
#[derive(Debug)]
pub struct JsonFileRecordStore {
    path: PathBuf,
}

impl JsonFileRecordStore {
    /// No IO happens until the first operation; a missing file is an empty
    /// collection.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<RecordCollection, StoreError> {
        let collection: RecordCollection = atomic::read_json(&self.path)?.unwrap_or_default();
        collection.check_integrity()?;
        Ok(collection)
    }

    /// Read-modify-write under the process-wide writer lock for this file.
    /// Nothing is written when `apply` fails.
    fn mutate<T>(
        &self,
        mut apply: impl FnMut(&mut RecordCollection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let lock = writer_lock(&self.path)?;
        let _guard = lock
            .lock()
            .map_err(|_| StoreError::Corrupt("writer lock poisoned".to_string()))?;

        for attempt in 0..CLAIM_ATTEMPTS {
            let mut collection = self.read()?;
            let base = collection.revision();
            let out = apply(&mut collection)?;
            let next = base + 1;

            if !atomic::claim(&self.path, next)? {
                self.clear_stale_claim(base, next)?;
                debug!(path = %self.path.display(), revision = next, attempt, "revision claimed elsewhere");
                thread::sleep(Duration::from_millis(1 << attempt.min(6)));
                continue;
            }
            // A free marker can also mean its writer already moved past it.
            if self.read()?.revision() != base {
                atomic::release(&self.path, next)?;
                continue;
            }

            collection.set_revision(next);
            if let Err(err) = atomic::write_json(&self.path, &collection) {
                if let Err(release) = atomic::release(&self.path, next) {
                    warn!(path = %self.path.display(), error = %release, "write claim left behind");
                }
                return Err(err);
            }
            if let Err(err) = atomic::release(&self.path, base) {
                warn!(path = %self.path.display(), error = %err, "old write claim left behind");
            }
            return Ok(out);
        }

        Err(StoreError::Contended(self.path.display().to_string()))
    }

    fn clear_stale_claim(&self, base: u64, next: u64) -> Result<(), StoreError> {
        let Some(age) = atomic::claim_age(&self.path, next)? else {
            return Ok(());
        };
        if age >= STALE_CLAIM && self.read()?.revision() == base {
            warn!(path = %self.path.display(), revision = next, "removing abandoned write claim");
            atomic::release(&self.path, next)?;
        }
        Ok(())
    }
}

/// One writer lock per canonical file path, shared by every handle in the process.
fn writer_lock(path: &Path) -> Result<Arc<Mutex<()>>, StoreError> {
    static WRITERS: OnceLock<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = OnceLock::new();

    let dir = atomic::parent_dir(path);
    fs::create_dir_all(dir)?;
    let dir = dir.canonicalize()?;
    let key = match path.file_name() {
        Some(name) => dir.join(name),
        None => dir,
    };

    let mut writers = WRITERS
        .get_or_init(Default::default)
        .lock()
        .map_err(|_| StoreError::Corrupt("writer registry poisoned".to_string()))?;
    Ok(Arc::clone(writers.entry(key).or_default()))
}

impl RecordStore for JsonFileRecordStore {
    fn create(&self, record: SettlementRecord) -> Result<SettlementRecord, StoreError> {
        let created = self.mutate(|c| c.create(record.clone()))?;
        info!(record_id = %created.id(), path = %self.path.display(), "record created");
        Ok(created)
    }

    fn load(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        let record = self.read()?.get(id)?;
        debug!(record_id = %id, version = record.version(), "record loaded");
        Ok(record)
    }

    fn save(
        &self,
        record: SettlementRecord,
        expected: ExpectedVersion,
    ) -> Result<SettlementRecord, StoreError> {
        let saved = self.mutate(|c| c.save(record.clone(), expected))?;
        info!(
            record_id = %saved.id(),
            version = saved.version(),
            status = %saved.status(),
            "record saved"
        );
        Ok(saved)
    }

    fn delete(&self, id: &RecordId) -> Result<SettlementRecord, StoreError> {
        let deleted = self.mutate(|c| c.delete(id))?;
        info!(record_id = %id, version = deleted.version(), "record soft-deleted");
        Ok(deleted)
    }

    fn purge(&self, id: &RecordId) -> Result<(), StoreError> {
        self.mutate(|c| c.purge(id))?;
        info!(record_id = %id, "record purged");
        Ok(())
    }

    fn list(&self, filter: &RecordFilter) -> Result<Vec<SettlementRecord>, StoreError> {
        let records = self.read()?.list(filter);
        debug!(count = records.len(), "records listed");
        Ok(records)
    }
}
