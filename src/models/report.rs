//! Per-run accounting handed back alongside the canonical dataset.

use serde::{Deserialize, Serialize};

/// A record whose region text matched nothing in the reference taxonomy.
/// Preserved verbatim for audit; never silently defaulted or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedEntry {
    pub original_region_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_subdivision_text: Option<String>,
    pub source_label: String,
}

/// A record rejected before resolution, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEntry {
    pub source_label: String,
    pub reason: String,
}

/// Summary of one pipeline run. Always produced, even for empty input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Records received across all sources.
    pub total_in: usize,
    /// Records whose region resolved and which entered clustering.
    pub resolved_count: usize,
    pub unresolved: Vec<UnresolvedEntry>,
    pub rejected: Vec<RejectedEntry>,
    pub clusters_found: usize,
    /// Records absorbed into another record during merging
    /// (sum over clusters of `len - 1`).
    pub records_merged: usize,
    /// Canonical records emitted.
    pub final_count: usize,
}
