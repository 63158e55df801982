//! Infrastructure layer: record persistence, settings files, configuration.

mod atomic;
pub mod config;
pub mod settings;
pub mod store;

pub use config::StoreConfig;
pub use settings::SettingsFile;
pub use store::{
    InMemoryRecordStore, JsonFileRecordStore, RecordCollection, RecordFilter, RecordStore,
    StoreError,
};
