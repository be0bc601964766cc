use thiserror::Error;

/// Failures surfaced to the caller of an authentication attempt.
///
/// Cloneable so the same error can be returned from an entry point and
/// delivered to the attempt's listener.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Bad caller input. Never reaches the server; safe to retry after correction.
    #[error("Validation error: {0}")]
    ValidationError(String),
    /// Transport failure or an `error` field in the server envelope. Not retried.
    #[error("Remote error: {0}")]
    RemoteError(String),
    /// Internal contract violation. Always fatal to the current attempt.
    #[error("Protocol error: {0}")]
    ProtocolError(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    AuthError(#[from] AuthError),
}

pub type Result<T> = std::result::Result<T, Error>;
