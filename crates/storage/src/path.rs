//! Slash-separated store paths.
//!
//! Leading, trailing, and repeated slashes are insignificant: `"/a//b/"`
//! and `"a/b"` address the same node, and the empty path is the root.

use crate::error::StoreError;

/// Characters the store refuses inside a key.
const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// Split a path into its non-empty segments.
pub fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form of a path (no leading or trailing slash).
pub fn normalize(path: &str) -> String {
    segments(path).join("/")
}

/// Join a relative path onto a base path.
pub fn join(base: &str, rel: &str) -> String {
    segments(base)
        .into_iter()
        .chain(segments(rel))
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether `path` is `prefix` or lies underneath it.
pub fn is_under(path: &str, prefix: &str) -> bool {
    let path = segments(path);
    let prefix = segments(prefix);
    path.len() >= prefix.len() && path.iter().zip(&prefix).all(|(a, b)| a == b)
}

/// Reject keys the store cannot hold.
pub fn validate(path: &str) -> Result<(), StoreError> {
    for segment in segments(path) {
        if let Some(c) = segment.chars().find(|c| FORBIDDEN.contains(c) || c.is_control()) {
            return Err(StoreError::InvalidPath {
                path: path.to_string(),
                reason: format!("key '{}' contains forbidden character {:?}", segment, c),
            });
        }
    }
    Ok(())
}
