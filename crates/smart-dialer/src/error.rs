//! Error taxonomy surfaced to embedders.
//!
//! Internally the store and source adapters propagate `anyhow::Error`; these
//! variants are what crosses the directory boundary. A query can never be
//! malformed, so there is no variant for it.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DialerError {
    /// The address book could not be read (permission denied, I/O error).
    #[error("contact source unavailable: {0}")]
    SourceUnavailable(String),

    /// The call-statistics store failed a read or write.
    #[error("call statistics store unavailable: {0}")]
    StoreUnavailable(String),
}

impl DialerError {
    pub fn source_unavailable(err: impl std::fmt::Display) -> Self {
        Self::SourceUnavailable(err.to_string())
    }

    pub fn store_unavailable(err: &anyhow::Error) -> Self {
        Self::StoreUnavailable(format!("{:#}", err))
    }
}

pub type DialerResult<T> = Result<T, DialerError>;
