//! Typed failures returned by every ledger and budget operation.
//!
//! The front end maps these to exit codes; an HTTP layer would map them to
//! status codes. Storage errors keep their `rusqlite` source.

use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    /// Malformed or out-of-range input.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness rule was violated, either by the pre-write check or by
    /// the storage constraint itself.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A user-owned record does not exist (or belongs to someone else).
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database operation failed: {0}")]
    Persistence(#[source] rusqlite::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub(crate) fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub(crate) fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Short machine-readable kind, used for JSON output.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::NotFound(_) => "not_found",
            Self::Unauthorized(_) => "unauthorized",
            Self::Persistence(_) => "persistence",
            Self::Config(_) => "config",
        }
    }

    pub(crate) fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Conflict(_) => 3,
            Self::NotFound(_) => 4,
            Self::Unauthorized(_) => 5,
            Self::Persistence(_) | Self::Config(_) => 1,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                Self::Conflict(
                    msg.clone()
                        .unwrap_or_else(|| "unique constraint violated".to_string()),
                )
            }
            _ => Self::Persistence(err),
        }
    }
}
