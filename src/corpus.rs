//! Document corpus discovery.
//!
//! Walks the configured documents root and returns the markdown files that
//! match the include globs and none of the exclude globs, sorted by relative
//! path so every run visits documents in the same order. Contents are read
//! later, one document at a time, by the pipelines.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use walkdir::WalkDir;

use crate::config::DocumentsConfig;

/// Jekyll post prefix: `YYYY-MM-DD-`.
static DATE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}-").unwrap());

/// A document file in the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusEntry {
    pub path: PathBuf,
    /// Path relative to the documents root, `/`-separated.
    pub relative: String,
}

impl CorpusEntry {
    /// Post slug derived from the file stem.
    pub fn slug(&self) -> String {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        slug_from_stem(&stem).to_string()
    }

    pub fn read(&self) -> std::io::Result<String> {
        std::fs::read_to_string(&self.path)
    }
}

/// Strip a Jekyll `YYYY-MM-DD-` date prefix from a file stem.
pub fn slug_from_stem(stem: &str) -> &str {
    match DATE_PREFIX.find(stem) {
        Some(m) if m.end() < stem.len() => &stem[m.end()..],
        _ => stem,
    }
}

pub fn scan_documents(config: &DocumentsConfig) -> Result<Vec<CorpusEntry>> {
    let root = &config.root;
    if !root.is_dir() {
        bail!("Documents root does not exist: {}", root.display());
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut default_excludes = vec!["**/.git/**".to_string(), "**/node_modules/**".to_string()];
    default_excludes.extend(config.exclude_globs.clone());
    let exclude_set = build_globset(&default_excludes)?;

    let mut entries = Vec::new();

    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = relative_path(root, path);

        if exclude_set.is_match(&relative) {
            continue;
        }
        if !include_set.is_match(&relative) {
            continue;
        }

        entries.push(CorpusEntry {
            path: path.to_path_buf(),
            relative,
        });
    }

    entries.sort_by(|a, b| a.relative.cmp(&b.relative));

    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
