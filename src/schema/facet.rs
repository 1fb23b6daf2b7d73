use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::error::{Error, Result};

/// Hierarchical category path of the form `/a/b/c`.
///
/// Every segment is non-empty and may not contain `/`. The root path `/`
/// alone is not a valid facet value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Facet(String);

impl Facet {
    pub fn from_text(text: &str) -> Result<Facet> {
        if !text.starts_with('/') {
            return Err(Error::schema_mismatch(format!(
                "facet value must start with '/': '{}'",
                text
            )));
        }
        if text.len() == 1 {
            return Err(Error::schema_mismatch("facet value '/' has no segments"));
        }
        for segment in text[1..].split('/') {
            if segment.is_empty() {
                return Err(Error::schema_mismatch(format!(
                    "facet value contains an empty segment: '{}'",
                    text
                )));
            }
        }
        Ok(Facet(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0[1..].split('/')
    }

    /// Whether `self` is at or under `prefix` (`/a/b` covers `/a/b` and
    /// `/a/b/c`, but not `/a/bc`).
    pub fn is_under(&self, prefix: &str) -> bool {
        facet_path_is_under(&self.0, prefix)
    }
}

/// Prefix relation on raw facet path strings, shared with dictionary scans.
pub fn facet_path_is_under(path: &str, prefix: &str) -> bool {
    if path == prefix {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.starts_with('/'),
        None => false,
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_facet_shape_validation() {
        assert!(Facet::from_text("/electronics/phones").is_ok());
        assert!(Facet::from_text("electronics").is_err());
        assert!(Facet::from_text("/").is_err());
        assert!(Facet::from_text("/a//b").is_err());
    }

    #[test]
    fn test_prefix_relation_respects_segment_boundaries() {
        let facet = Facet::from_text("/a/b/c").unwrap();
        assert!(facet.is_under("/a"));
        assert!(facet.is_under("/a/b"));
        assert!(facet.is_under("/a/b/c"));
        assert!(!facet.is_under("/a/bc"));
        assert!(!facet.is_under("/b"));
    }
}
