//! Conversions between the three key spellings: dotted (`a.b.c`), store keys
//! (`a/b/c`), and segment lists.
//!
//! The codec functions are total and never fail. Validation of user-supplied
//! keys lives in [`parse_dotted`], which every operation calls before touching
//! the store.

use crate::error::RenvError;

pub const STORE_SEPARATOR: char = '/';
pub const DOTTED_SEPARATOR: char = '.';

/// Split a dotted key into segments. Empty segments are dropped.
pub fn from_dotted(dotted: &str) -> Vec<String> {
    dotted
        .split(DOTTED_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a store key into segments, discarding empty leading/trailing parts.
pub fn from_store_key(key: &str) -> Vec<String> {
    key.split(STORE_SEPARATOR)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Join segments into a relative store key (`a/b/c`).
pub fn to_store_key<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("/")
}

/// Join segments into a dotted key (`a.b.c`).
pub fn to_dotted<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(".")
}

/// Parse a caller-supplied dotted key, rejecting empty segments and segments
/// that embed the store separator.
pub fn parse_dotted(dotted: &str) -> Result<Vec<String>, RenvError> {
    if dotted.is_empty() {
        return Err(RenvError::MalformedInput("empty key".into()));
    }
    let segments: Vec<String> = dotted.split(DOTTED_SEPARATOR).map(str::to_string).collect();
    for segment in &segments {
        check_segment(segment).map_err(|reason| {
            RenvError::MalformedInput(format!("invalid key '{dotted}': {reason}"))
        })?;
    }
    Ok(segments)
}

/// A segment is usable as a store path component: non-empty, no separators.
///
/// `.` is rejected as well: a dotted segment cannot be addressed back through
/// a dotted key, and `.`/`..` are collapsed by URL path normalization before
/// they reach the store.
pub fn check_segment(segment: &str) -> Result<(), String> {
    if segment.is_empty() {
        return Err("empty segment".into());
    }
    for separator in [STORE_SEPARATOR, DOTTED_SEPARATOR] {
        if segment.contains(separator) {
            return Err(format!("segment '{segment}' contains '{separator}'"));
        }
    }
    Ok(())
}
