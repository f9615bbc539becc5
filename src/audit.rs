//! Audit pipeline: document references vs. remote inventory.
//!
//! Scans every document in the corpus for delivery URLs, lists the remote
//! inventory, and reconciles the two. Documents are scanned first so a bad
//! corpus fails before any request is made. The inventory fetch is all or
//! nothing; a failed page aborts the audit.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::config::{Config, DocumentsConfig, ReportConfig};
use crate::corpus::scan_documents;
use crate::inventory::{fetch_inventory, AssetHost};
use crate::reconcile::{reconcile, ReconciliationReport};
use crate::references::{ReferenceExtractor, ReferenceIndex};

#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub reconciliation: ReconciliationReport,
}

impl AuditReport {
    /// Human-readable summary, capped by `caps`.
    pub fn summary_lines(&self, caps: &ReportConfig) -> Vec<String> {
        let report = &self.reconciliation;
        let totals = &report.totals;
        let mut lines = vec![
            "audit".to_string(),
            format!("  documents scanned: {}", totals.documents_scanned),
            format!(
                "  references: {} ({} unique)",
                totals.total_references, totals.unique_references
            ),
            format!(
                "  remote assets: {} ({} pages)",
                totals.remote_assets, totals.pages_fetched
            ),
            format!("  matched: {}", totals.matched),
            format!("  missing: {}", totals.missing),
        ];

        for missing in &report.missing {
            lines.push(format!(
                "    - {} ({} documents)",
                missing.id,
                missing.documents.len()
            ));
            for document in missing.documents.iter().take(caps.max_documents_per_missing) {
                lines.push(format!("        {}", document));
            }
            if let Some(rest) = more(missing.documents.len(), caps.max_documents_per_missing) {
                lines.push(format!("        ... and {} more", rest));
            }
        }

        lines.push(format!("  unused: {}", totals.unused));
        for id in report.unused.iter().take(caps.max_unused_listed) {
            lines.push(format!("    - {}", id));
        }
        if let Some(rest) = more(report.unused.len(), caps.max_unused_listed) {
            lines.push(format!("    ... and {} more", rest));
        }

        lines.push("ok".to_string());
        lines
    }

    pub fn print_summary(&self, caps: &ReportConfig) {
        for line in self.summary_lines(caps) {
            println!("{}", line);
        }
    }

    /// Write the full, uncapped report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(())
    }
}

fn more(len: usize, cap: usize) -> Option<usize> {
    (len > cap).then(|| len - cap)
}

/// Scan the corpus and index every delivery-URL reference.
///
/// An unreadable document aborts the scan: a partial index would report
/// its assets as unused.
pub fn build_reference_index(
    documents: &DocumentsConfig,
    extractor: &ReferenceExtractor,
) -> Result<ReferenceIndex> {
    let mut index = ReferenceIndex::new();
    for entry in scan_documents(documents)? {
        let content = entry
            .read()
            .with_context(|| format!("Failed to read {}", entry.path.display()))?;
        let ids = extractor.extract(&content);
        debug!(document = %entry.relative, references = ids.len(), "scanned");
        index.record(&entry.relative, ids);
    }
    Ok(index)
}

/// Run the audit against `host`.
pub fn run_audit(config: &Config, host: &dyn AssetHost) -> Result<AuditReport> {
    let extractor = ReferenceExtractor::from_config(config.asset_host()?)?;
    let index = build_reference_index(&config.documents, &extractor)?;
    info!(
        documents = index.documents_scanned(),
        references = index.total_references(),
        unique = index.unique_references(),
        "indexed references"
    );

    let inventory = fetch_inventory(host)?;
    info!(
        assets = inventory.len(),
        pages = inventory.pages(),
        "fetched remote inventory"
    );

    Ok(AuditReport {
        generated_at: Utc::now(),
        reconciliation: reconcile(&index, &inventory),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetId;
    use crate::reconcile::{MissingAsset, ReconciliationTotals};

    fn report(missing: Vec<(&str, Vec<&str>)>, unused: Vec<&str>) -> AuditReport {
        let missing: Vec<MissingAsset> = missing
            .into_iter()
            .map(|(id, docs)| MissingAsset {
                id: AssetId::from(id),
                documents: docs.into_iter().map(String::from).collect(),
            })
            .collect();
        let unused: Vec<AssetId> = unused.into_iter().map(AssetId::from).collect();
        AuditReport {
            generated_at: Utc::now(),
            reconciliation: ReconciliationReport {
                totals: ReconciliationTotals {
                    missing: missing.len(),
                    unused: unused.len(),
                    ..Default::default()
                },
                missing,
                unused,
            },
        }
    }

    #[test]
    fn summary_caps_listings() {
        let report = report(
            vec![("01/a", vec!["1.md", "2.md", "3.md", "4.md", "5.md"])],
            vec!["u1", "u2", "u3"],
        );
        let caps = ReportConfig {
            max_documents_per_missing: 2,
            max_unused_listed: 1,
        };
        let lines = report.summary_lines(&caps);

        assert!(lines.contains(&"    - 01/a (5 documents)".to_string()));
        assert!(lines.contains(&"        2.md".to_string()));
        assert!(!lines.contains(&"        3.md".to_string()));
        assert!(lines.contains(&"        ... and 3 more".to_string()));
        assert!(lines.contains(&"    - u1".to_string()));
        assert!(!lines.contains(&"    - u2".to_string()));
        assert!(lines.contains(&"    ... and 2 more".to_string()));
        assert_eq!(lines.last().map(String::as_str), Some("ok"));
    }

    #[test]
    fn summary_without_overflow_has_no_more_line() {
        let report = report(vec![("x", vec!["a.md"])], vec![]);
        let lines = report.summary_lines(&ReportConfig::default());
        assert!(!lines.iter().any(|l| l.contains("more")));
        assert!(lines.contains(&"  missing: 1".to_string()));
        assert!(lines.contains(&"  unused: 0".to_string()));
    }

    #[test]
    fn json_report_is_uncapped() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("reports/audit.json");
        let unused: Vec<String> = (0..20).map(|i| format!("u{:02}", i)).collect();
        let report = report(vec![], unused.iter().map(String::as_str).collect());

        report.write_json(&path).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["unused"].as_array().unwrap().len(), 20);
        assert_eq!(json["totals"]["unused"], 20);
        assert!(json["generated_at"].is_string());
    }
}
