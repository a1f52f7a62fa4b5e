//! Cache subsystem error types.

use thiserror::Error;

/// Errors surfaced by the image cache to its callers.
///
/// Only `StoreBusy` is expected in steady state; callers treat it as
/// transient and retry on the next render pass. Nothing here should abort a
/// page render.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    /// The embedded store held its lock past the bounded wait.
    #[error("image store is busy")]
    StoreBusy,

    /// The embedded store failed outright.
    #[error("image store failure: {message}")]
    Store { message: String },

    /// Local file I/O failed (blacklist, taxonomy labels).
    #[error("io error: {message}")]
    Io { message: String },

    /// The HTTP client could not be constructed.
    #[error("http client error: {message}")]
    Http { message: String },
}

impl CacheError {
    /// Creates a store failure error.
    #[must_use]
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an HTTP client error.
    #[must_use]
    pub fn http(message: impl Into<String>) -> Self {
        Self::Http {
            message: message.into(),
        }
    }

    /// Whether a retry on the next render pass may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::StoreBusy)
    }
}
