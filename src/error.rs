//! Error types for the forge-coach library.
//!
//! The first five variants are the coaching taxonomy surfaced to callers. Every
//! one of them is terminal for the current request. The rest wrap
//! infrastructure failures from storage, serialization and configuration.

use thiserror::Error;

/// Errors that can occur in the coaching engine.
#[derive(Error, Debug)]
pub enum CoachError {
    /// Resource (or some link of its ownership chain) does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Resource exists but belongs to another user.
    ///
    /// Renders exactly like [`CoachError::NotFound`] so that cross-tenant
    /// existence cannot be inferred from the error shape.
    #[error("{0} not found")]
    Unauthorized(&'static str),

    /// Subscription tier ceiling reached
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Passage, question or enumerated literal outside its accepted bounds
    #[error("Validation error: {0}")]
    Validation(String),

    /// External model call failed
    #[error("Coaching service is temporarily unavailable")]
    ServiceUnavailable,

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Connection pool errors
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl CoachError {
    /// True for both missing and foreign resources.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Unauthorized(_))
    }

    /// Short stable label used for telemetry and logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::Validation(_) => "validation",
            Self::ServiceUnavailable => "service_unavailable",
            Self::Database(_) | Self::Pool(_) | Self::Io(_) => "storage",
            Self::Serialization(_) => "serialization",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for Result with `CoachError`
pub type Result<T> = std::result::Result<T, CoachError>;

impl From<anyhow::Error> for CoachError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
