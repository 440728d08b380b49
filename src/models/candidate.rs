//! Candidate listings as delivered by scraper collaborators, plus their
//! geography-resolved form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// One facility listing as scraped from a single source.
///
/// Only `name` and `source_label` are required; everything else is noisy,
/// partially-missing free text. Field semantics follow the input contract;
/// no transport format is implied by this type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Source-local identifier, when the source exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Facility name as published by the source.
    pub name: String,

    /// Free-text facility type ("Hospital", "PHC", "Health Post", …).
    #[serde(rename = "type", default)]
    pub facility_type: String,

    /// Free-text province field, in whatever spelling the source used.
    #[serde(default)]
    pub region_text: String,

    /// Free-text district field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subdivision_text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Label of the source this listing came from.
    #[serde(default)]
    pub source_label: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrieved_at: Option<DateTime<Utc>>,
}

impl CandidateRecord {
    /// Create a candidate with the required fields only.
    pub fn new(name: &str, region_text: &str, source_label: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            facility_type: String::new(),
            region_text: region_text.to_string(),
            subdivision_text: None,
            address: None,
            phone: None,
            position: None,
            website: None,
            source_label: source_label.to_string(),
            retrieved_at: None,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.position.is_some()
    }
}

/// Outcome of mapping free-text province input onto the official taxonomy.
///
/// There is deliberately no default variant: input that matches nothing
/// stays `Unresolved` with the original text preserved for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RegionResolution {
    Resolved { code: u8, name: String },
    Unresolved { original: String },
}

impl RegionResolution {
    pub fn code(&self) -> Option<u8> {
        match self {
            RegionResolution::Resolved { code, .. } => Some(*code),
            RegionResolution::Unresolved { .. } => None,
        }
    }

}

/// Outcome of mapping free-text district input onto the official taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubdivisionResolution {
    Resolved { name: String },
    Unresolved { original: String },
    /// The source supplied no district field at all.
    Absent,
}

impl SubdivisionResolution {
    pub fn name(&self) -> Option<&str> {
        match self {
            SubdivisionResolution::Resolved { name } => Some(name),
            _ => None,
        }
    }
}

/// A candidate with its geography resolved against the reference registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedRecord {
    pub candidate: CandidateRecord,
    pub region: RegionResolution,
    pub subdivision: SubdivisionResolution,

    /// Human-readable notes for every non-exact substitution the resolver
    /// applied, e.g. `region "bagmati pradesh" -> "Bagmati" (alias)`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<String>,
}

impl ResolvedRecord {
    pub fn region_code(&self) -> Option<u8> {
        self.region.code()
    }

    /// Stable ordering key, independent of arrival order.
    ///
    /// Covers the full record content so that no two non-identical members
    /// of a cluster ever compare equal; otherwise a stable sort would fall
    /// back to arrival order and break permutation invariance.
    pub(crate) fn stable_key(&self) -> String {
        let c = &self.candidate;
        let position = c
            .position
            .map(|p| format!("{:.6},{:.6}", p.lat, p.lon))
            .unwrap_or_default();
        [
            c.source_label.as_str(),
            c.id.as_deref().unwrap_or(""),
            &crate::normalize::normalize(&c.name),
            c.facility_type.as_str(),
            c.subdivision_text.as_deref().unwrap_or(""),
            c.address.as_deref().unwrap_or(""),
            c.phone.as_deref().unwrap_or(""),
            c.website.as_deref().unwrap_or(""),
            &position,
        ]
        .join("\u{1f}")
    }
}
