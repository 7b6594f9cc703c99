//! Error types for one poll cycle.
//!
//! Every failure kind aborts the cycle it occurs in. None of them is fatal to
//! the process: the poller logs the error and schedules the next cycle.

use crate::registry::RegistryError;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure of a poll cycle.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request could not be sent, or the transport failed mid-response.
    #[error("transport error fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The device answered with a non-success HTTP status.
    #[error("device returned HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// The structured document is malformed or lacks an expected section.
    #[error("structured feed parse error: {0}")]
    Parse(String),

    /// The diagnostics page does not contain the values the clamp channels need.
    #[error("diagnostics extraction error: {0}")]
    Extraction(String),

    /// A required field is absent.
    #[error("required field `{0}` is missing")]
    MissingField(String),

    /// A field is present but its value is not a number.
    #[error("field `{field}` has non-numeric value {value:?}")]
    InvalidNumber { field: String, value: String },

    /// The registry rejected an update (unknown instrument, label arity, kind).
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl Error {
    /// Short, stable name of the error family, used in logs and `/health`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport { .. } | Self::HttpStatus { .. } => "transport",
            Self::Parse(_) => "parse",
            Self::Extraction(_) => "extraction",
            Self::MissingField(_) | Self::InvalidNumber { .. } => "schema",
            Self::Registry(_) => "registry",
        }
    }
}
