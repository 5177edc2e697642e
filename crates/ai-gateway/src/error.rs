//! Gateway error types

/// Outcome of a `try_generate` call that produced no text.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Every key in the pool was tried once and every attempt failed.
    #[error("all {attempts} attempts failed")]
    Exhausted { attempts: usize },
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
