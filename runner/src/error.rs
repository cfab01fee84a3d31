use crate::engine::EngineError;
use crate::storage::StorageError;
use thiserror::Error;
use tokio::io;
use zoyla_report::export::ExportError;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a URL")]
    EmptyUrl,
    #[error("Invalid URL \"{0}\": {1}")]
    InvalidUrl(String, String),
    #[error("Unsupported URL scheme \"{0}\", only http and https are allowed")]
    UnsupportedScheme(String),
    #[error("Number of requests must be between {min} and {max}, got {value}")]
    RequestCountOutOfRange { value: u32, min: u32, max: u32 },
    #[error("Concurrency must be between {min} and {max}, got {value}")]
    ConcurrencyOutOfRange { value: u32, min: u32, max: u32 },
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("IO error")]
    IoError(#[from] io::Error),
    #[error("Cannot load configuration: {0}")]
    CannotLoadConfiguration(String),
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Logging initialization failure: {0}")]
    LoggingInitFailure(String),
    #[error("Invalid test configuration: {0}")]
    Validation(#[from] ValidationError),
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("No engine executable configured, set engine.executable or ZOYLA_ENGINE__EXECUTABLE")]
    EngineNotConfigured,
    #[error("Test rejected: {0}")]
    RunRejected(String),
    #[error("Test failed: {0}")]
    RunFailed(String),
    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(String),
    #[error("Cannot export results: {0}")]
    CannotExport(#[from] ExportError),
    #[error("Cannot write chart: {0}")]
    CannotWriteChart(String),
}
