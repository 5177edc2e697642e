//! Classification of rejected Gemini calls
//!
//! Gemini reports both per-minute rate limits and exhausted daily quota as
//! 429 `RESOURCE_EXHAUSTED`; only the quota wording should park a key. An
//! invalid or expired key comes back as 400 `INVALID_ARGUMENT` with an
//! `API_KEY_INVALID` reason, or as 401/403.

use provider::ErrorClassification;

/// Phrases in a 429 body that mean the key's quota is used up.
const QUOTA_PATTERNS: &[&str] = &[
    "resource_exhausted",
    "quota",
    "exceeded your current",
];

/// Phrases in a 400 body that mean the key itself is bad.
const INVALID_KEY_PATTERNS: &[&str] = &[
    "api_key_invalid",
    "api key not valid",
    "api key expired",
];

fn contains_any(body: &str, patterns: &[&str]) -> bool {
    let lower = body.to_lowercase();
    patterns.iter().any(|p| lower.contains(p))
}

/// Classify a 429 body as quota exhaustion or a plain rate limit.
pub fn classify_429(body: &str) -> ErrorClassification {
    if contains_any(body, QUOTA_PATTERNS) {
        ErrorClassification::QuotaExceeded
    } else {
        ErrorClassification::Transient
    }
}

/// Classify a rejected call by HTTP status and response body.
///
/// 429 dispatches to `classify_429`; 401/403 and 400 with an invalid-key
/// reason are Permanent; everything else is Transient.
pub fn classify_status(status: u16, body: &str) -> ErrorClassification {
    match status {
        429 => classify_429(body),
        401 | 403 => ErrorClassification::Permanent,
        400 if contains_any(body, INVALID_KEY_PATTERNS) => ErrorClassification::Permanent,
        _ => ErrorClassification::Transient,
    }
}
