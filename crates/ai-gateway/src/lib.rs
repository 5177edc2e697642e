//! Resilient access layer for the generative-AI service
//!
//! `AiGateway` wraps one logical "prompt in, HTML out" call with key rotation,
//! bounded sequential failover and a fixed fallback:
//!
//! 1. Take the next key from the shared `CredentialPool`
//! 2. Call the `TextGenerator` with it, bounded by a per-attempt timeout
//! 3. Success → render the markdown to HTML and return
//! 4. Failure → report it to the pool, move on to the next key
//! 5. After `pool.len()` failed attempts → `FALLBACK_MESSAGE`

pub mod error;
pub mod gateway;
pub mod metrics;
pub mod render;

pub use error::{Error, Result};
pub use gateway::{AiGateway, DEFAULT_ATTEMPT_TIMEOUT, FALLBACK_MESSAGE};
pub use render::markdown_to_html;
