//! Application-wide error types.
//!
//! Library modules use the unified [`Error`] enum via `thiserror`, while
//! CLI/main uses `anyhow` for convenient propagation. Every error maps to
//! a machine-readable [`ErrorKind`] so callers (CLI today, an API layer
//! tomorrow) can report `{kind, message}` without parsing display strings.
//!
//! Two outcomes from the apply pipeline are deliberately *not* errors:
//! a run stopped by the safety cap and a per-item I/O failure both produce
//! a normal run report (see `apply::report`).

use std::path::PathBuf;

use serde::Serialize;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Machine-readable error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Malformed or missing input, rejected before any work begins
    Validation,
    /// Required external state is absent (no active store, store missing)
    Precondition,
    /// The named lock is already held; never waited on, never retried
    Concurrency,
    /// Everything else
    Internal,
}

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input or configuration
    #[error("validation: {0}")]
    Validation(String),

    /// Missing external state (active store pointer, store file)
    #[error("precondition: {0}")]
    Precondition(String),

    /// Exclusive lock already held by another run
    #[error("lock held: {0}")]
    Concurrency(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Staging store error
    #[error("store error: {0}")]
    Database(#[from] sqlx::Error),

    /// Store file missing from disk
    #[error("store not found: {0}")]
    StoreNotFound(PathBuf),

    /// Unexpected internal failure (corrupt artifacts, serialization)
    #[error("internal: {0}")]
    Internal(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Structured error payload exposed to collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a precondition error.
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Create a concurrency error.
    pub fn concurrency(message: impl Into<String>) -> Self {
        Self::Concurrency(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Classify this error for structured reporting.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Precondition(_) | Self::StoreNotFound(_) => ErrorKind::Precondition,
            Self::Concurrency(_) => ErrorKind::Concurrency,
            Self::Io(_) | Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
            Self::WithContext { source, .. } => source.kind(),
        }
    }

    /// Structured `{kind, message}` payload.
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, sqlx::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Database(e).context(ctx))
    }
}
