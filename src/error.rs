use crate::domain::record::RecordOrigin;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Invalid reference: a payment or order reference is required")]
    InvalidReference,
    #[error("Lookup unavailable: {0}")]
    LookupUnavailable(String),
    #[error("Unrecognized {origin} status value: {raw:?}")]
    UnrecognizedStatusValue { origin: RecordOrigin, raw: String },
    #[error("Invalid delivery distance: {0} km")]
    InvalidDistance(f64),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Watch task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDbError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, StatusError>;
