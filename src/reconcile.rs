//! Two-way reconciliation of referenced ids against the remote inventory.
//!
//! - **missing**: referenced by at least one document, absent remotely.
//! - **unused**: stored remotely, referenced by no document.
//!
//! Ids are compared by exact string equality. Both lists come out sorted by
//! id, so the same inputs always give the same report.

use serde::Serialize;

use crate::inventory::RemoteInventory;
use crate::models::AssetId;
use crate::references::ReferenceIndex;

/// A referenced id with no remote counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingAsset {
    pub id: AssetId,
    /// Every document that references the id, in scan order.
    pub documents: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationTotals {
    pub documents_scanned: usize,
    pub total_references: usize,
    pub unique_references: usize,
    pub remote_assets: usize,
    pub pages_fetched: usize,
    pub missing: usize,
    pub unused: usize,
    /// Referenced ids that do exist remotely.
    pub matched: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationReport {
    pub missing: Vec<MissingAsset>,
    pub unused: Vec<AssetId>,
    pub totals: ReconciliationTotals,
}

pub fn reconcile(index: &ReferenceIndex, inventory: &RemoteInventory) -> ReconciliationReport {
    let missing: Vec<MissingAsset> = index
        .iter()
        .filter(|(id, _)| !inventory.contains(id))
        .map(|(id, documents)| MissingAsset {
            id: id.clone(),
            documents: documents.to_vec(),
        })
        .collect();

    let unused: Vec<AssetId> = inventory
        .iter()
        .filter(|id| !index.contains(id))
        .cloned()
        .collect();

    let totals = ReconciliationTotals {
        documents_scanned: index.documents_scanned(),
        total_references: index.total_references(),
        unique_references: index.unique_references(),
        remote_assets: inventory.len(),
        pages_fetched: inventory.pages(),
        missing: missing.len(),
        unused: unused.len(),
        matched: index.unique_references() - missing.len(),
    };

    ReconciliationReport {
        missing,
        unused,
        totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(records: &[(&str, &[&str])]) -> ReferenceIndex {
        let mut index = ReferenceIndex::new();
        for (doc, ids) in records {
            index.record(doc, ids.iter().map(|id| AssetId::from(*id)).collect());
        }
        index
    }

    fn inventory(ids: &[&str]) -> RemoteInventory {
        ids.iter().map(|id| AssetId::from(*id)).collect()
    }

    fn ids(list: &[AssetId]) -> Vec<&str> {
        list.iter().map(AssetId::as_str).collect()
    }

    #[test]
    fn matched_reference_is_neither_missing_nor_unused() {
        let report = reconcile(
            &index(&[("2022-03-01-launch-day.md", &["03/hero"])]),
            &inventory(&["03/hero"]),
        );
        assert!(report.missing.is_empty());
        assert!(report.unused.is_empty());
        assert_eq!(report.totals.matched, 1);
    }

    #[test]
    fn splits_both_directions() {
        let report = reconcile(
            &index(&[("a.md", &["01/x", "02/y"]), ("b.md", &["02/y", "03/z"])]),
            &inventory(&["01/x", "04/w", "05/v"]),
        );

        let missing: Vec<_> = report
            .missing
            .iter()
            .map(|m| (m.id.as_str(), m.documents.clone()))
            .collect();
        assert_eq!(
            missing,
            vec![
                ("02/y", vec!["a.md".to_string(), "b.md".to_string()]),
                ("03/z", vec!["b.md".to_string()]),
            ]
        );
        assert_eq!(ids(&report.unused), vec!["04/w", "05/v"]);
        assert_eq!(
            report.totals,
            ReconciliationTotals {
                documents_scanned: 2,
                total_references: 4,
                unique_references: 3,
                remote_assets: 3,
                pages_fetched: 0,
                missing: 2,
                unused: 2,
                matched: 1,
            }
        );
    }

    #[test]
    fn missing_and_unused_never_overlap_and_cover_the_difference() {
        let idx = index(&[("a.md", &["a", "b", "c"]), ("b.md", &["d"])]);
        let inv = inventory(&["b", "d", "e", "f"]);
        let report = reconcile(&idx, &inv);

        for m in &report.missing {
            assert!(idx.contains(&m.id));
            assert!(!inv.contains(&m.id));
            assert!(!report.unused.contains(&m.id));
        }
        for u in &report.unused {
            assert!(inv.contains(u));
            assert!(!idx.contains(u));
        }
        let missing_count = idx.ids().filter(|id| !inv.contains(id)).count();
        let unused_count = inv.iter().filter(|id| !idx.contains(id)).count();
        assert_eq!(report.missing.len(), missing_count);
        assert_eq!(report.unused.len(), unused_count);
    }

    #[test]
    fn comparison_is_exact() {
        let report = reconcile(&index(&[("a.md", &["03/Hero"])]), &inventory(&["03/hero"]));
        assert_eq!(report.missing.len(), 1);
        assert_eq!(ids(&report.unused), vec!["03/hero"]);
    }

    #[test]
    fn empty_inputs() {
        let report = reconcile(&ReferenceIndex::new(), &RemoteInventory::default());
        assert_eq!(report, ReconciliationReport::default());
    }

    #[test]
    fn serializes_ids_as_strings() {
        let report = reconcile(&index(&[("a.md", &["x"])]), &inventory(&["y"]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["missing"][0]["id"], "x");
        assert_eq!(json["missing"][0]["documents"][0], "a.md");
        assert_eq!(json["unused"][0], "y");
        assert_eq!(json["totals"]["matched"], 0);
    }
}
