use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Object not found: {key}")]
    NotFound { key: String },

    /// Store failure that may succeed on retry (timeouts, throttling, 5xx).
    #[error("Transient store error: {0}")]
    Transient(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Malformed key {key}: {reason}")]
    MalformedKey { key: String, reason: String },

    #[error("No backups found under {path}")]
    NoBackups { path: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn not_found(key: impl Into<String>) -> Self {
        Error::NotFound { key: key.into() }
    }

    pub fn malformed_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Transient(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
