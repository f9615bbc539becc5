//! Asset references found in document bodies.
//!
//! A delivery URL has the shape
//!
//! ```text
//! https://res.cloudinary.com/<cloud>/image/upload/<transform>/<public id>
//! ```
//!
//! Everything after the single transform segment up to a quote, whitespace,
//! `<`, `>` or `)` is the canonical asset id.

use anyhow::{Context, Result};
use regex::Regex;
use std::collections::{BTreeMap, HashSet};

use crate::config::AssetHostConfig;
use crate::models::AssetId;

/// Extracts asset ids from delivery URLs of one account.
#[derive(Debug, Clone)]
pub struct ReferenceExtractor {
    pattern: Regex,
}

impl ReferenceExtractor {
    /// Build an extractor for `delivery_base_url` (e.g.
    /// `https://res.cloudinary.com`) and `account` (the cloud name).
    ///
    /// The scheme of `delivery_base_url` is ignored; both `http` and `https`
    /// references match.
    pub fn new(delivery_base_url: &str, account: &str, resource_type: &str) -> Result<Self> {
        let host = delivery_base_url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        let pattern = format!(
            r#"https?://{}/{}/{}/upload/[^/\s"'<>]+/([^"'\s<>)]+)"#,
            regex::escape(host),
            regex::escape(account),
            regex::escape(resource_type),
        );
        let pattern = Regex::new(&pattern)
            .with_context(|| format!("Invalid reference pattern for {}", host))?;
        Ok(Self { pattern })
    }

    pub fn from_config(config: &AssetHostConfig) -> Result<Self> {
        Self::new(
            &config.delivery_base_url,
            &config.cloud_name,
            &config.resource_type,
        )
    }

    /// Every referenced id in `body`, in document order, duplicates included.
    pub fn extract(&self, body: &str) -> Vec<AssetId> {
        self.pattern
            .captures_iter(body)
            .filter_map(|caps| {
                let id = caps[1].trim_matches(|c: char| c == '"' || c == '\'' || c.is_whitespace());
                (!id.is_empty()).then(|| AssetId::from(id))
            })
            .collect()
    }
}

/// Asset id → documents that reference it, in scan order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceIndex {
    entries: BTreeMap<AssetId, Vec<String>>,
    documents_scanned: usize,
    total_references: usize,
}

impl ReferenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one scanned document and the ids extracted from it.
    ///
    /// Each id is listed once per recorded document, but every match counts
    /// toward [`total_references`](Self::total_references).
    pub fn record(&mut self, document: &str, ids: Vec<AssetId>) {
        self.documents_scanned += 1;
        self.total_references += ids.len();
        let mut seen = HashSet::new();
        for id in ids {
            if seen.insert(id.clone()) {
                self.entries
                    .entry(id)
                    .or_default()
                    .push(document.to_string());
            }
        }
    }

    pub fn documents_for(&self, id: &AssetId) -> Option<&[String]> {
        self.entries.get(id).map(Vec::as_slice)
    }

    pub fn contains(&self, id: &AssetId) -> bool {
        self.entries.contains_key(id)
    }

    /// Referenced ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &AssetId> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, &[String])> {
        self.entries.iter().map(|(id, docs)| (id, docs.as_slice()))
    }

    pub fn unique_references(&self) -> usize {
        self.entries.len()
    }

    pub fn total_references(&self) -> usize {
        self.total_references
    }

    pub fn documents_scanned(&self) -> usize {
        self.documents_scanned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ReferenceExtractor {
        ReferenceExtractor::new("https://res.cloudinary.com", "acct", "image").unwrap()
    }

    fn ids(body: &str) -> Vec<String> {
        extractor()
            .extract(body)
            .into_iter()
            .map(AssetId::into_string)
            .collect()
    }

    #[test]
    fn extracts_id_after_transform() {
        let body = r#"<img src="https://res.cloudinary.com/acct/image/upload/w_800/03/hero" alt="">"#;
        assert_eq!(ids(body), vec!["03/hero"]);
    }

    #[test]
    fn terminators() {
        let body = "![a](https://res.cloudinary.com/acct/image/upload/f_auto/01/a)\n\
                    https://res.cloudinary.com/acct/image/upload/q_80/02/b end\n\
                    <https://res.cloudinary.com/acct/image/upload/q_80/c>\n\
                    src='https://res.cloudinary.com/acct/image/upload/v1/04/d'\n\
                    https://res.cloudinary.com/acct/image/upload/v1/05/e";
        assert_eq!(ids(body), vec!["01/a", "02/b", "c", "04/d", "05/e"]);
    }

    #[test]
    fn keeps_document_order_and_duplicates() {
        let body = "https://res.cloudinary.com/acct/image/upload/w_1/b x \
                    https://res.cloudinary.com/acct/image/upload/w_1/a x \
                    https://res.cloudinary.com/acct/image/upload/w_2/b";
        assert_eq!(ids(body), vec!["b", "a", "b"]);
    }

    #[test]
    fn other_accounts_and_hosts_are_ignored() {
        let body = "https://res.cloudinary.com/other/image/upload/w_1/a \
                    https://example.com/acct/image/upload/w_1/b \
                    https://res.cloudinary.com/acct/video/upload/w_1/c";
        assert!(ids(body).is_empty());
    }

    #[test]
    fn http_scheme_matches() {
        assert_eq!(
            ids("http://res.cloudinary.com/acct/image/upload/w_1/x"),
            vec!["x"]
        );
    }

    #[test]
    fn url_without_id_segment_is_ignored() {
        assert!(ids("https://res.cloudinary.com/acct/image/upload/w_800 trailing").is_empty());
    }

    #[test]
    fn index_folds_mentions_within_a_document() {
        let mut index = ReferenceIndex::new();
        index.record("a.md", vec!["x".into(), "y".into(), "x".into()]);
        index.record("b.md", vec!["x".into()]);
        index.record("c.md", vec![]);

        assert_eq!(
            index.documents_for(&"x".into()),
            Some(&["a.md".to_string(), "b.md".to_string()][..])
        );
        assert_eq!(index.documents_for(&"y".into()), Some(&["a.md".to_string()][..]));
        assert_eq!(index.total_references(), 4);
        assert_eq!(index.unique_references(), 2);
        assert_eq!(index.documents_scanned(), 3);
    }

    #[test]
    fn mentions_keep_scan_order() {
        let mut index = ReferenceIndex::new();
        index.record("b.md", vec!["x".into()]);
        index.record("a.md", vec!["x".into(), "x".into()]);
        assert_eq!(
            index.documents_for(&"x".into()),
            Some(&["b.md".to_string(), "a.md".to_string()][..])
        );
    }
}
