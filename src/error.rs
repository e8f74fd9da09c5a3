use thiserror::Error;

/// Local storage rejected a write (quota exceeded, storage disabled, ...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("storage unavailable")]
    Unavailable,

    #[error("write rejected for key {key}: {reason}")]
    WriteRejected { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("failed to encode telemetry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("upload failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("memory_pairs must be between 1 and {max}, got {got}")]
    MemoryPairs { got: usize, max: usize },

    #[error("verbal_repeat_probability must be within 0..=1, got {0}")]
    RepeatProbability(f64),

    #[error("unknown log level: {0}")]
    LogLevel(String),
}

/// Crate-level error surfaced at the wasm boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("browser API unavailable: {0}")]
    Browser(String),
}
