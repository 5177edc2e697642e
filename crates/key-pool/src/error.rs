//! Error types for pool construction

/// Errors from building a credential pool. All are fatal configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("credential pool requires at least one API key")]
    Empty,

    #[error("API key at position {0} is blank")]
    BlankCredential(usize),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
