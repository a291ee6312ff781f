//! Error types for Rango

use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum RangoError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// API error
    #[error("API error: {0}")]
    Api(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Password hashing error
    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    /// Not found error
    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    /// Blocking task failed to complete
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for Rango operations
pub type Result<T> = std::result::Result<T, RangoError>;

impl From<argon2::password_hash::Error> for RangoError {
    fn from(e: argon2::password_hash::Error) -> Self {
        RangoError::PasswordHash(e.to_string())
    }
}
