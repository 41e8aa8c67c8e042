use thiserror::Error;

/// Main error type for name recovery and object reconstruction
#[derive(Error, Debug)]
pub enum RecoveryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Memory mapping error: {0}")]
    Mmap(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fuzzy hash bit widths differ: {left} vs {right}")]
    BitWidthMismatch { left: u8, right: u8 },

    #[error("Malformed {kind} node: {reason}")]
    MalformedTree { kind: String, reason: String },

    #[error("Handler '{handler}' rejected statement: {reason}")]
    Handler {
        handler: &'static str,
        reason: String,
    },
}

impl RecoveryError {
    pub(crate) fn malformed(kind: impl ToString, reason: impl Into<String>) -> Self {
        Self::MalformedTree {
            kind: kind.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for RecoveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

/// Result type alias for recovery operations
pub type Result<T> = std::result::Result<T, RecoveryError>;
