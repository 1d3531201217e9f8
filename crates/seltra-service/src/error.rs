//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(#[from] seltra_core::EngineError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] seltra_telemetry::TelemetryError),

    #[error("Malformed tick: {0}")]
    Tick(String),

    #[error("Unknown pool: {0}")]
    UnknownPool(String),

    #[error("Pool task stopped: {0}")]
    ChannelClosed(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
