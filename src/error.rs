use thiserror::Error;

/// Structured error hierarchy for Bulus.
///
/// Each subsystem produces its own error enum; the coordinator and binary
/// fold them into `anyhow` at the boundary. Library callers can match on the
/// variants to decide recovery strategy.
#[derive(Debug, Error)]
pub enum BulusError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("brain: {0}")]
    Brain(#[from] BrainError),

    // Generic fallthrough (wraps anyhow for interop)
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("write failed for session {session_id}: {message}")]
    Write { session_id: String, message: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Brain failures never cross the coordinator boundary as faults — they
/// degrade to `error` actions. These variants exist for callers driving the
/// brain directly.
#[derive(Debug, Error)]
pub enum BrainError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("backend request failed: {0}")]
    Backend(String),

    #[error("malformed backend response: {0}")]
    Response(String),
}

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, BulusError>;
