//! Text-generation service abstraction
//!
//! Defines the `TextGenerator` trait the gateway calls once per attempt, and
//! the `GenerationError` taxonomy every implementation reports failures with.
//! The gateway treats every variant the same way (this attempt failed, move
//! on to the next key); the classification only feeds pool health.

pub mod gemini;

pub use gemini::GeminiGenerator;

use std::future::Future;
use std::pin::Pin;

/// Classification of a failed attempt, used to drive per-key pool state.
///
/// - QuotaExceeded: the key hit its rate or quota limit
/// - Permanent: the key was rejected (invalid, expired, revoked)
/// - Transient: network, timeout, 5xx, malformed output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    Transient,
    QuotaExceeded,
    Permanent,
}

impl ErrorClassification {
    /// Label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ErrorClassification::Transient => "transient",
            ErrorClassification::QuotaExceeded => "quota_exceeded",
            ErrorClassification::Permanent => "permanent",
        }
    }
}

/// A single failed call to the text-generation service.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Upstream answered with a non-success status (auth, quota, 5xx).
    #[error("upstream rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("attempt timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no text")]
    Empty,
}

impl GenerationError {
    /// Short label for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::Rejected { .. } => "rejected",
            GenerationError::Timeout => "timeout",
            GenerationError::Transport(_) => "transport",
            GenerationError::Malformed(_) => "malformed",
            GenerationError::Empty => "empty",
        }
    }
}

/// Result alias for generation calls.
pub type Result<T> = std::result::Result<T, GenerationError>;

/// An opaque remote "prompt in, text out" call authorized by one credential.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn TextGenerator>`).
pub trait TextGenerator: Send + Sync {
    /// Identifier for logging (e.g. "gemini").
    fn id(&self) -> &str;

    /// Generate raw text for `prompt` using `credential`.
    ///
    /// Returns the model's raw (markdown) output. Implementations do not
    /// retry; the caller owns retry and failover.
    fn generate<'a>(
        &'a self,
        credential: &'a str,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;
}
