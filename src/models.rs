//! Core data models shared by the extraction and audit pipelines.
//!
//! The only concept the two pipelines have in common is the [`AssetId`]:
//! extraction writes it into front matter, the audit reads it back out of
//! delivery URLs and compares it against the remote inventory.

use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Canonical identifier of an asset on the remote host.
///
/// Either `<bucket>/<basename>` (month bucket from the legacy upload path) or
/// a bare `<basename>`. Compared by exact string equality everywhere.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for AssetId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An uploaded media object from the legacy export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub url: String,
}

/// Lookup table from post slug or post title to attachment id.
///
/// Slugs and titles share one key space. Inserting an existing key replaces
/// the previous binding.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailBindings {
    by_key: HashMap<String, String>,
}

impl ThumbnailBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `attachment_id`, returning the attachment id it replaced.
    pub fn bind(&mut self, key: impl Into<String>, attachment_id: impl Into<String>) -> Option<String> {
        self.by_key.insert(key.into(), attachment_id.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.by_key.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rebinding_a_key_keeps_the_last_value() {
        let mut bindings = ThumbnailBindings::new();
        assert_eq!(bindings.bind("launch-day", "42"), None);
        assert_eq!(bindings.bind("launch-day", "43"), Some("42".to_string()));
        assert_eq!(bindings.get("launch-day"), Some("43"));
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn asset_id_serializes_as_plain_string() {
        let id = AssetId::from("03/hero");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"03/hero\"");
        assert_eq!(id.to_string(), "03/hero");
    }
}
