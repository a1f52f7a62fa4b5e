//! Upstream fetch error classification.

use thiserror::Error;

/// Why an upstream fetch produced no record.
///
/// Never crosses the provider port boundary: implementations log the
/// classification and map it to an absent result, so the orchestrator always
/// sees a uniform "no image available" outcome.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The upstream endpoint was unreachable or answered with an error.
    #[error("upstream request failed: {message}")]
    Network { message: String },

    /// The response decoded, but a required field was missing or malformed.
    #[error("malformed upstream response: {message}")]
    Malformed { message: String },

    /// Every candidate photo was blacklisted or banned.
    #[error("no eligible photo candidate")]
    NoCandidate,

    /// The scientific name has no entry in the local taxonomy table.
    #[error("species not in taxonomy: {sci_name}")]
    UnknownSpecies { sci_name: String },
}

impl FetchError {
    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates a malformed-response error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates an unknown-species error.
    #[must_use]
    pub fn unknown_species(sci_name: impl Into<String>) -> Self {
        Self::UnknownSpecies {
            sci_name: sci_name.into(),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::network("request timed out")
        } else if e.is_connect() {
            Self::network(format!("failed to connect: {e}"))
        } else if e.is_decode() {
            Self::malformed(e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}
