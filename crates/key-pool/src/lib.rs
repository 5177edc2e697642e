//! Rotating pool of interchangeable Gemini API keys
//!
//! Hands keys out round-robin from a single shared cursor so a bounded retry
//! loop can try every key at most once per request. The pool is built once at
//! startup from configuration and shared by reference (`Arc`) with every
//! caller; keys are immutable for the life of the process.
//!
//! Rotation:
//! 1. `next()` advances the shared cursor by exactly one step (atomic)
//! 2. The key at `cursor % len` is returned, never blocking, never failing
//! 3. Callers report outcomes back with `report_success` / `report_failure`
//! 4. With a cooldown configured, quota/permanent failures park a key for the
//!    cooldown and `next()` scans past parked keys (without extra cursor steps)

pub mod error;
pub mod pool;
pub mod quota;

pub use error::{Error, Result};
pub use pool::{Credential, CredentialPool, SelectedCredential};
pub use quota::{classify_429, classify_status};
