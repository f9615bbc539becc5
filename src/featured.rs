//! Featured-image extraction pipeline.
//!
//! Legacy export → resolver → front matter. For every document in the
//! corpus:
//!
//! 1. Parse the front matter; skip the document if there is none.
//! 2. Skip it if any accepted featured-image key is already set.
//! 3. Resolve the post (slug from the file name, then `title`) to a
//!    canonical asset id; skip it if that fails.
//! 4. Append the id under the primary key and rewrite the file.
//!
//! Skipped documents are never rewritten, so running the pipeline twice is
//! safe. A failure on one document is recorded and the batch continues;
//! only an unreadable export aborts the run.

use anyhow::{Context, Result};
use std::fmt;
use tracing::{debug, info, warn};

use crate::config::{Config, FrontMatterConfig};
use crate::corpus::{scan_documents, CorpusEntry};
use crate::error::DocumentError;
use crate::front_matter::{Document, FrontMatter};
use crate::legacy_export::{load_export, ExportStats, LegacyExport};
use crate::models::AssetId;
use crate::resolver::{FeaturedAssetResolver, UnresolvedReference};

/// The key `extract` writes, plus the other keys that count as already set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedKeys {
    pub primary: String,
    pub aliases: Vec<String>,
}

impl FeaturedKeys {
    pub fn new(primary: impl Into<String>, aliases: Vec<String>) -> Self {
        Self {
            primary: primary.into(),
            aliases,
        }
    }

    /// First accepted key present in `fm`, primary key first.
    pub fn present_in<'a>(&'a self, fm: &FrontMatter) -> Option<&'a str> {
        std::iter::once(&self.primary)
            .chain(self.aliases.iter())
            .find(|key| fm.contains_key(key))
            .map(String::as_str)
    }
}

impl Default for FeaturedKeys {
    fn default() -> Self {
        FeaturedKeys::from(&FrontMatterConfig::default())
    }
}

impl From<&FrontMatterConfig> for FeaturedKeys {
    fn from(config: &FrontMatterConfig) -> Self {
        Self::new(config.key.clone(), config.aliases.clone())
    }
}

/// Why a document was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoFrontMatter,
    AlreadySet { key: String },
    Unresolved(UnresolvedReference),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoFrontMatter => write!(f, "no front matter"),
            SkipReason::AlreadySet { key } => write!(f, "already has '{}'", key),
            SkipReason::Unresolved(reason) => write!(f, "{}", reason),
        }
    }
}

/// Result of updating one document's content.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    Updated { asset_id: AssetId, content: String },
    Skipped(SkipReason),
}

/// Compute the new content for one document.
///
/// Pure: nothing is written. `Skipped` means the caller must leave the
/// document exactly as it is.
pub fn update_document(
    content: &str,
    slug: &str,
    resolver: &FeaturedAssetResolver<'_>,
    keys: &FeaturedKeys,
) -> Result<UpdateOutcome, DocumentError> {
    let mut doc = Document::parse(content);
    let Some(fm) = doc.front_matter.as_mut() else {
        return Ok(UpdateOutcome::Skipped(SkipReason::NoFrontMatter));
    };

    if let Some(key) = keys.present_in(fm) {
        return Ok(UpdateOutcome::Skipped(SkipReason::AlreadySet {
            key: key.to_string(),
        }));
    }

    let asset_id = match resolver.resolve(slug, fm.title()) {
        Ok(id) => id,
        Err(reason) => return Ok(UpdateOutcome::Skipped(SkipReason::Unresolved(reason))),
    };

    fm.insert(keys.primary.clone(), asset_id.as_str());
    let content = doc.render()?;
    Ok(UpdateOutcome::Updated { asset_id, content })
}

/// Per-document result of an extraction run.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentOutcome {
    Updated(AssetId),
    Skipped(SkipReason),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub document: String,
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    /// Compute outcomes without writing any file.
    pub dry_run: bool,
    /// Process at most this many documents.
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractReport {
    pub dry_run: bool,
    pub export_stats: ExportStats,
    pub results: Vec<DocumentResult>,
}

impl ExtractReport {
    pub fn found(&self) -> usize {
        self.results.len()
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Updated(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped(_)))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&DocumentOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    fn skipped_where(&self, pred: impl Fn(&SkipReason) -> bool) -> usize {
        self.count(|o| matches!(o, DocumentOutcome::Skipped(r) if pred(r)))
    }

    /// Printed summary. Ends with `ok` only when no document failed.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            if self.dry_run {
                "extract (dry-run)".to_string()
            } else {
                "extract".to_string()
            },
            format!("  attachments in export: {}", self.export_stats.attachments),
            format!(
                "  posts with featured images: {}",
                self.export_stats.featured_posts
            ),
            format!("  documents found: {}", self.found()),
            format!("  updated: {}", self.updated()),
            format!("  skipped: {}", self.skipped()),
            format!(
                "    no front matter: {}",
                self.skipped_where(|r| matches!(r, SkipReason::NoFrontMatter))
            ),
            format!(
                "    already set: {}",
                self.skipped_where(|r| matches!(r, SkipReason::AlreadySet { .. }))
            ),
            format!(
                "    unresolved: {}",
                self.skipped_where(|r| matches!(r, SkipReason::Unresolved(_)))
            ),
            format!("  failed: {}", self.failed()),
        ];
        for result in &self.results {
            if let DocumentOutcome::Failed(cause) = &result.outcome {
                lines.push(format!("    - {}: {}", result.document, cause));
            }
        }
        if self.failed() == 0 {
            lines.push("ok".to_string());
        }
        lines
    }

    pub fn print_summary(&self) {
        for line in self.summary_lines() {
            println!("{}", line);
        }
    }
}

/// Load the configured export and run the pipeline over the corpus.
pub fn run_extract(config: &Config, options: ExtractOptions) -> Result<ExtractReport> {
    let export_config = config.export()?;
    let export = load_export(&export_config.path)
        .with_context(|| format!("Failed to load export {}", export_config.path.display()))?;
    info!(
        attachments = export.stats.attachments,
        featured_posts = export.stats.featured_posts,
        "loaded legacy export"
    );
    extract_featured_images(config, &export, options)
}

/// Run the pipeline with an already-parsed export.
pub fn extract_featured_images(
    config: &Config,
    export: &LegacyExport,
    options: ExtractOptions,
) -> Result<ExtractReport> {
    let mut entries = scan_documents(&config.documents)?;
    if let Some(limit) = options.limit {
        entries.truncate(limit);
    }

    let resolver = FeaturedAssetResolver::new(export);
    let keys = FeaturedKeys::from(&config.front_matter);

    let results = entries
        .iter()
        .map(|entry| DocumentResult {
            document: entry.relative.clone(),
            outcome: process_document(entry, &resolver, &keys, options.dry_run),
        })
        .collect();

    Ok(ExtractReport {
        dry_run: options.dry_run,
        export_stats: export.stats.clone(),
        results,
    })
}

fn process_document(
    entry: &CorpusEntry,
    resolver: &FeaturedAssetResolver<'_>,
    keys: &FeaturedKeys,
    dry_run: bool,
) -> DocumentOutcome {
    match try_process_document(entry, resolver, keys, dry_run) {
        Ok(DocumentOutcome::Updated(id)) => {
            info!(document = %entry.relative, asset_id = %id, "updated");
            DocumentOutcome::Updated(id)
        }
        Ok(outcome) => {
            if let DocumentOutcome::Skipped(reason) = &outcome {
                debug!(document = %entry.relative, %reason, "skipped");
            }
            outcome
        }
        Err(e) => {
            warn!(document = %entry.relative, error = %e, "failed");
            DocumentOutcome::Failed(e.to_string())
        }
    }
}

fn try_process_document(
    entry: &CorpusEntry,
    resolver: &FeaturedAssetResolver<'_>,
    keys: &FeaturedKeys,
    dry_run: bool,
) -> Result<DocumentOutcome, DocumentError> {
    let content = entry.read().map_err(|source| DocumentError::Read {
        path: entry.path.clone(),
        source,
    })?;

    match update_document(&content, &entry.slug(), resolver, keys)? {
        UpdateOutcome::Skipped(reason) => Ok(DocumentOutcome::Skipped(reason)),
        UpdateOutcome::Updated { asset_id, content } => {
            if !dry_run {
                std::fs::write(&entry.path, content).map_err(|source| DocumentError::Write {
                    path: entry.path.clone(),
                    source,
                })?;
            }
            Ok(DocumentOutcome::Updated(asset_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Attachment;

    fn launch_export() -> LegacyExport {
        let mut export = LegacyExport::default();
        export.attachments.insert(
            "42".to_string(),
            Attachment {
                id: "42".to_string(),
                url: "https://blog.example/wp-content/uploads/2022/03/hero.png".to_string(),
            },
        );
        export.bindings.bind("launch-day", "42");
        export.bindings.bind("Launch Day", "42");
        export
    }

    #[test]
    fn injects_resolved_id_and_keeps_body() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let content = "---\nlayout: post\ntitle: Launch Day\n---\nWe shipped!\n";

        let outcome =
            update_document(content, "launch-day", &resolver, &FeaturedKeys::default()).unwrap();
        let UpdateOutcome::Updated { asset_id, content } = outcome else {
            panic!("expected update");
        };
        assert_eq!(asset_id.as_str(), "03/hero");
        assert_eq!(
            content,
            "---\nlayout: post\ntitle: Launch Day\nfeatured_image: 03/hero\n---\nWe shipped!\n"
        );
    }

    #[test]
    fn title_fallback_when_slug_unknown() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let content = "---\ntitle: Launch Day\n---\n";
        let outcome =
            update_document(content, "renamed", &resolver, &FeaturedKeys::default()).unwrap();
        assert!(matches!(outcome, UpdateOutcome::Updated { .. }));
    }

    #[test]
    fn either_accepted_key_skips() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let keys = FeaturedKeys::default();
        for (content, key) in [
            ("---\nfeatured_image: old/one\n---\nbody", "featured_image"),
            ("---\nimage: /img/x.png\n---\nbody", "image"),
        ] {
            let outcome = update_document(content, "launch-day", &resolver, &keys).unwrap();
            assert_eq!(
                outcome,
                UpdateOutcome::Skipped(SkipReason::AlreadySet {
                    key: key.to_string()
                })
            );
        }
    }

    #[test]
    fn missing_front_matter_skips() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let outcome =
            update_document("# Launch\n", "launch-day", &resolver, &FeaturedKeys::default())
                .unwrap();
        assert_eq!(outcome, UpdateOutcome::Skipped(SkipReason::NoFrontMatter));
    }

    #[test]
    fn unresolved_post_skips() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let outcome = update_document(
            "---\ntitle: Other\n---\n",
            "other",
            &resolver,
            &FeaturedKeys::default(),
        )
        .unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::Skipped(SkipReason::Unresolved(UnresolvedReference::NoBinding))
        );
    }

    #[test]
    fn updated_content_is_then_skipped() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let keys = FeaturedKeys::default();
        let first = update_document("---\ntitle: x\n---\nbody", "launch-day", &resolver, &keys)
            .unwrap();
        let UpdateOutcome::Updated { content, .. } = first else {
            panic!("expected update");
        };
        let second = update_document(&content, "launch-day", &resolver, &keys).unwrap();
        assert!(matches!(second, UpdateOutcome::Skipped(SkipReason::AlreadySet { .. })));
    }

    #[test]
    fn custom_primary_key() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let keys = FeaturedKeys::new("cover", vec![]);
        let outcome =
            update_document("---\nimage: a\n---\n", "launch-day", &resolver, &keys).unwrap();
        let UpdateOutcome::Updated { content, .. } = outcome else {
            panic!("expected update");
        };
        assert!(content.contains("cover: 03/hero\n"));
    }

    #[test]
    fn quoted_yes_title_survives_update() {
        let export = launch_export();
        let resolver = FeaturedAssetResolver::new(&export);
        let content = "---\ntitle: \"yes\"\npublished: 'off'\n---\nBody\n";

        let outcome =
            update_document(content, "launch-day", &resolver, &FeaturedKeys::default()).unwrap();
        let UpdateOutcome::Updated { content, .. } = outcome else {
            panic!("expected update");
        };
        assert_eq!(
            content,
            "---\ntitle: 'yes'\npublished: 'off'\nfeatured_image: 03/hero\n---\nBody\n"
        );
    }

    #[test]
    fn summary_ends_with_ok_only_without_failures() {
        let mut report = ExtractReport {
            results: vec![DocumentResult {
                document: "2022-03-01-launch-day.md".to_string(),
                outcome: DocumentOutcome::Updated(AssetId::from("03/hero")),
            }],
            ..Default::default()
        };
        assert_eq!(report.summary_lines().last().map(String::as_str), Some("ok"));

        report.results.push(DocumentResult {
            document: "broken.md".to_string(),
            outcome: DocumentOutcome::Failed("permission denied".to_string()),
        });
        let lines = report.summary_lines();
        assert!(!lines.contains(&"ok".to_string()));
        assert!(lines.contains(&"  failed: 1".to_string()));
        assert_eq!(
            lines.last().map(String::as_str),
            Some("    - broken.md: permission denied")
        );
    }
}
