//! Cluster and canonical-record types: the output side of the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::candidate::{GeoPoint, ResolvedRecord};
use crate::error::DedupeError;

/// A non-empty group of resolved records judged to represent one physical
/// institution.
///
/// Invariant: every member carries the same resolved region code. The public
/// constructor validates this; the clusterer uses the unchecked path because
/// it only ever groups within a single region partition.
#[derive(Debug, Clone)]
pub struct DuplicateCluster {
    members: Vec<ResolvedRecord>,
}

impl DuplicateCluster {
    pub fn new(members: Vec<ResolvedRecord>) -> Result<Self, DedupeError> {
        let first_code = members
            .first()
            .and_then(|m| m.region_code())
            .ok_or_else(|| {
                DedupeError::Cluster("cluster must be non-empty and region-resolved".to_string())
            })?;

        for member in &members {
            match member.region_code() {
                Some(code) if code == first_code => {}
                Some(code) => {
                    return Err(DedupeError::Cluster(format!(
                        "mixed region codes in cluster: {} and {}",
                        first_code, code
                    )));
                }
                None => {
                    return Err(DedupeError::Cluster(
                        "cluster member has unresolved region".to_string(),
                    ));
                }
            }
        }

        Ok(Self { members })
    }

    /// Build without validation. Callers must guarantee the invariants.
    pub(crate) fn from_partition_members(members: Vec<ResolvedRecord>) -> Self {
        debug_assert!(!members.is_empty());
        Self { members }
    }

    pub fn members(&self) -> &[ResolvedRecord] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Shared region code of every member.
    pub fn region_code(&self) -> u8 {
        // Non-emptiness and resolution are construction invariants.
        self.members
            .first()
            .and_then(|m| m.region_code())
            .unwrap_or(0)
    }
}

/// The single authoritative record for one physical institution.
///
/// This is the only artifact handed to persistence/display collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    /// Deterministic id, stable across re-runs on unchanged input.
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub facility_type: String,

    pub region_code: u8,
    pub region_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subdivision_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<GeoPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    /// Distinct source labels of every contributing listing. Never empty.
    pub sources: Vec<String>,

    pub last_updated: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::{CandidateRecord, RegionResolution, SubdivisionResolution};

    fn resolved(name: &str, code: u8) -> ResolvedRecord {
        ResolvedRecord {
            candidate: CandidateRecord::new(name, "x", "test"),
            region: RegionResolution::Resolved {
                code,
                name: format!("Region {}", code),
            },
            subdivision: SubdivisionResolution::Absent,
            corrections: vec![],
        }
    }

    #[test]
    fn test_cluster_rejects_empty() {
        assert!(DuplicateCluster::new(vec![]).is_err());
    }

    #[test]
    fn test_cluster_rejects_mixed_regions() {
        let result = DuplicateCluster::new(vec![resolved("a", 1), resolved("b", 2)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cluster_accepts_same_region() {
        let cluster = DuplicateCluster::new(vec![resolved("a", 3), resolved("b", 3)]).unwrap();
        assert_eq!(cluster.len(), 2);
        assert_eq!(cluster.region_code(), 3);
    }
}
