//! Shared types for the MaaS services
//!
//! Holds the redacting `Secret` wrapper used for API keys and the
//! configuration error type every crate reports startup failures with.

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
