//! TOML configuration.
//!
//! ```toml
//! [documents]
//! root = "_posts"
//!
//! [export]
//! path = "wordpress-export.xml"
//!
//! [front_matter]
//! key = "featured_image"
//! aliases = ["image"]
//!
//! [asset_host]
//! cloud_name = "circleseven"
//!
//! [report]
//! max_documents_per_missing = 3
//! max_unused_listed = 10
//! ```
//!
//! Only `[documents]` is required. `extract` additionally needs `[export]`
//! and `audit` needs `[asset_host]`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest page the Cloudinary Admin API will return.
pub const MAX_PAGE_SIZE: usize = 500;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub export: Option<ExportConfig>,
    #[serde(default)]
    pub front_matter: FrontMatterConfig,
    #[serde(default)]
    pub asset_host: Option<AssetHostConfig>,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DocumentsConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.markdown".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub path: PathBuf,
}

/// Front-matter keys that hold the featured image.
#[derive(Debug, Deserialize, Clone)]
pub struct FrontMatterConfig {
    /// Key written by `extract`.
    #[serde(default = "default_featured_key")]
    pub key: String,
    /// Other keys that also count as "already has a featured image".
    #[serde(default = "default_featured_aliases")]
    pub aliases: Vec<String>,
}

impl Default for FrontMatterConfig {
    fn default() -> Self {
        Self {
            key: default_featured_key(),
            aliases: default_featured_aliases(),
        }
    }
}

fn default_featured_key() -> String {
    "featured_image".to_string()
}
fn default_featured_aliases() -> Vec<String> {
    vec!["image".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssetHostConfig {
    pub cloud_name: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_delivery_base_url")]
    pub delivery_base_url: String,
    #[serde(default = "default_resource_type")]
    pub resource_type: String,
    #[serde(default = "default_upload_type")]
    pub upload_type: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com".to_string()
}
fn default_delivery_base_url() -> String {
    "https://res.cloudinary.com".to_string()
}
fn default_resource_type() -> String {
    "image".to_string()
}
fn default_upload_type() -> String {
    "upload".to_string()
}
fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}
fn default_timeout_secs() -> u64 {
    30
}

/// How much of the audit report is printed. The report data is never cut.
#[derive(Debug, Deserialize, Clone)]
pub struct ReportConfig {
    #[serde(default = "default_max_documents_per_missing")]
    pub max_documents_per_missing: usize,
    #[serde(default = "default_max_unused_listed")]
    pub max_unused_listed: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            max_documents_per_missing: default_max_documents_per_missing(),
            max_unused_listed: default_max_unused_listed(),
        }
    }
}

fn default_max_documents_per_missing() -> usize {
    3
}
fn default_max_unused_listed() -> usize {
    10
}

impl Config {
    pub fn export(&self) -> Result<&ExportConfig> {
        self.export
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("[export] is not configured"))
    }

    pub fn asset_host(&self) -> Result<&AssetHostConfig> {
        self.asset_host
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("[asset_host] is not configured"))
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

fn validate(config: &Config) -> Result<()> {
    if config.front_matter.key.trim().is_empty() {
        anyhow::bail!("front_matter.key must not be empty");
    }

    if let Some(host) = &config.asset_host {
        if host.cloud_name.trim().is_empty() {
            anyhow::bail!("asset_host.cloud_name must not be empty");
        }
        if !(1..=MAX_PAGE_SIZE).contains(&host.page_size) {
            anyhow::bail!("asset_host.page_size must be in [1, {}]", MAX_PAGE_SIZE);
        }
        if host.timeout_secs == 0 {
            anyhow::bail!("asset_host.timeout_secs must be > 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = parse_config("[documents]\nroot = \"_posts\"\n").unwrap();
        assert_eq!(config.documents.root, PathBuf::from("_posts"));
        assert_eq!(config.documents.include_globs, default_include_globs());
        assert_eq!(config.front_matter.key, "featured_image");
        assert_eq!(config.front_matter.aliases, vec!["image"]);
        assert_eq!(config.report.max_documents_per_missing, 3);
        assert_eq!(config.report.max_unused_listed, 10);
        assert!(config.export().is_err());
        assert!(config.asset_host().is_err());
    }

    #[test]
    fn asset_host_defaults() {
        let config = parse_config(
            "[documents]\nroot = \"_posts\"\n[asset_host]\ncloud_name = \"demo\"\n",
        )
        .unwrap();
        let host = config.asset_host().unwrap();
        assert_eq!(host.api_base_url, "https://api.cloudinary.com");
        assert_eq!(host.delivery_base_url, "https://res.cloudinary.com");
        assert_eq!(host.resource_type, "image");
        assert_eq!(host.upload_type, "upload");
        assert_eq!(host.page_size, 500);
    }

    #[test]
    fn rejects_oversized_page() {
        let err = parse_config(
            "[documents]\nroot = \"p\"\n[asset_host]\ncloud_name = \"demo\"\npage_size = 501\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("page_size"));
    }

    #[test]
    fn rejects_empty_featured_key() {
        let err = parse_config("[documents]\nroot = \"p\"\n[front_matter]\nkey = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("front_matter.key"));
    }

    #[test]
    fn example_config_parses() {
        let config = parse_config(include_str!("../config/assets.example.toml")).unwrap();
        assert_eq!(config.asset_host().unwrap().cloud_name, "my-cloud");
        assert_eq!(
            config.export().unwrap().path,
            PathBuf::from("wordpress-export.xml")
        );
    }

    #[test]
    fn documents_section_is_required() {
        assert!(parse_config("[export]\npath = \"x.xml\"\n").is_err());
    }
}
