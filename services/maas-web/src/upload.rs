//! Upload filename sanitizing

use unicode_normalization::UnicodeNormalization;

/// Reduce a client-supplied filename to a safe, flat ASCII name.
///
/// The name is NFKD-normalized and non-ASCII is dropped, so accented
/// letters keep their base letter. Path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9._-]` is removed, and dots and
/// underscores are trimmed from both ends. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if matches!(c, '/' | '\\') { ' ' } else { c })
        .collect();

    let cleaned: String = ascii
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        .collect();
    cleaned.trim_matches(['.', '_']).to_string()
}
