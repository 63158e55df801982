//! Settlement record persistence.
//!
//! Both stores enforce the same rules through `RecordCollection`: unique ids,
//! store-assigned versions with optimistic concurrency, and the record
//! lifecycle (finalized records are read-only, deleted records are frozen).

pub mod collection;
pub mod filter;
pub mod in_memory;
pub mod json_file;
pub mod r#trait;

pub use collection::RecordCollection;
pub use filter::RecordFilter;
pub use in_memory::InMemoryRecordStore;
pub use json_file::JsonFileRecordStore;
pub use r#trait::{RecordStore, StoreError};
