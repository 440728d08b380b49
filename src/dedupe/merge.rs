//! Reduces a duplicate cluster to one canonical record.

use chrono::Utc;
use tracing::debug;
use xxhash_rust::xxh64::xxh64;

use crate::models::{CanonicalRecord, DuplicateCluster, RegionResolution, ResolvedRecord};
use crate::normalize::{normalize, normalize_phone};

/// Source labels containing any of these mark an authoritative listing
/// (ministry registries and official reporting systems).
pub const AUTHORITATIVE_KEYWORDS: &[&str] =
    &["mohp", "dohs", "hmis", "ministry", "government", "official"];

const ADDRESS_POINTS_PER_CHAR: f64 = 0.01;
const PHONE_BONUS: f64 = 2.0;
const COORDINATE_BONUS: f64 = 3.0;
const WEBSITE_BONUS: f64 = 1.0;
const AUTHORITATIVE_BONUS: f64 = 5.0;

/// Deterministic, permutation-invariant cluster merging.
///
/// The richest member (by completeness score) becomes the primary; every
/// field it lacks is filled from the other members, preferring the longer
/// value. Provenance is the union of all members' source labels. Merging
/// the same cluster twice yields a byte-identical record apart from the
/// refreshed `last_updated`.
#[derive(Debug, Clone)]
pub struct RecordMerger {
    authoritative: Vec<String>,
}

impl Default for RecordMerger {
    fn default() -> Self {
        Self::new(AUTHORITATIVE_KEYWORDS)
    }
}

impl RecordMerger {
    pub fn new(authoritative_keywords: &[&str]) -> Self {
        Self {
            authoritative: authoritative_keywords
                .iter()
                .map(|k| normalize(k))
                .collect(),
        }
    }

    /// Completeness score used for primary selection.
    pub fn completeness(&self, record: &ResolvedRecord) -> f64 {
        let c = &record.candidate;
        let mut score = 0.0;

        if let Some(address) = &c.address {
            score += address.trim().chars().count() as f64 * ADDRESS_POINTS_PER_CHAR;
        }
        if c.phone.as_deref().is_some_and(|p| !p.trim().is_empty()) {
            score += PHONE_BONUS;
        }
        if c.has_coordinates() {
            score += COORDINATE_BONUS;
        }
        if c.website.as_deref().is_some_and(|w| !w.trim().is_empty()) {
            score += WEBSITE_BONUS;
        }
        if self.is_authoritative(&c.source_label) {
            score += AUTHORITATIVE_BONUS;
        }

        score
    }

    pub fn is_authoritative(&self, source_label: &str) -> bool {
        let label = normalize(source_label);
        self.authoritative.iter().any(|k| label.contains(k))
    }

    pub fn merge(&self, cluster: &DuplicateCluster) -> CanonicalRecord {
        // Canonical member order: completeness descending, then the stable
        // per-record key. Arrival order never influences the output, which
        // is what makes the merge permutation-invariant.
        let mut ordered: Vec<(f64, &ResolvedRecord)> = cluster
            .members()
            .iter()
            .map(|m| (self.completeness(m), m))
            .collect();
        ordered.sort_by(|(sa, a), (sb, b)| {
            sb.total_cmp(sa)
                .then_with(|| a.stable_key().cmp(&b.stable_key()))
        });

        let primary = ordered[0].1;
        let rest: Vec<&ResolvedRecord> = ordered.iter().skip(1).map(|(_, m)| *m).collect();

        let (region_code, region_name) = match &primary.region {
            RegionResolution::Resolved { code, name } => (*code, name.clone()),
            // Unreachable under the cluster invariant.
            RegionResolution::Unresolved { .. } => (0, String::new()),
        };

        let name = primary.candidate.name.trim().to_string();

        let facility_type = pick_text(
            Some(primary.candidate.facility_type.as_str()),
            rest.iter().map(|m| m.candidate.facility_type.as_str()),
        )
        .unwrap_or_default();

        let subdivision_name = primary
            .subdivision
            .name()
            .map(|n| n.to_string())
            .or_else(|| {
                rest.iter()
                    .find_map(|m| m.subdivision.name().map(|n| n.to_string()))
            });

        let address = pick_text(
            primary.candidate.address.as_deref(),
            rest.iter().filter_map(|m| m.candidate.address.as_deref()),
        );
        let phone = pick_text(
            primary.candidate.phone.as_deref(),
            rest.iter().filter_map(|m| m.candidate.phone.as_deref()),
        );
        let website = pick_text(
            primary.candidate.website.as_deref(),
            rest.iter().filter_map(|m| m.candidate.website.as_deref()),
        );

        let position = primary
            .candidate
            .position
            .or_else(|| rest.iter().find_map(|m| m.candidate.position));

        // Provenance union in canonical member order; never overwritten.
        let mut sources = Vec::new();
        for (_, member) in &ordered {
            let label = member.candidate.source_label.clone();
            if !label.is_empty() && !sources.contains(&label) {
                sources.push(label);
            }
        }

        // The id seed folds in subdivision, address and phone so that two
        // clusters in one region whose primaries merely share a name still
        // get distinct ids.
        let id_seed = [
            normalize(&name),
            subdivision_name.as_deref().map(normalize).unwrap_or_default(),
            address.as_deref().map(normalize).unwrap_or_default(),
            phone.as_deref().and_then(normalize_phone).unwrap_or_default(),
        ]
        .join("\u{1f}");
        let id = format!("HF-{}-{:016x}", region_code, xxh64(id_seed.as_bytes(), 0));

        debug!(
            "merged cluster of {} into {} ({} sources)",
            cluster.len(),
            id,
            sources.len()
        );

        CanonicalRecord {
            id,
            name,
            facility_type,
            region_code,
            region_name,
            subdivision_name,
            address,
            phone,
            position,
            website,
            sources,
            last_updated: Utc::now(),
        }
    }
}

/// Primary's value when usable, otherwise the longest value on offer
/// (ties broken lexicographically).
fn pick_text<'a>(
    primary: Option<&'a str>,
    others: impl Iterator<Item = &'a str>,
) -> Option<String> {
    if let Some(p) = primary {
        let trimmed = p.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }
    others
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .max_by(|a, b| a.len().cmp(&b.len()).then_with(|| b.cmp(a)))
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRecord, GeoPoint, SubdivisionResolution};

    fn resolved(name: &str, source: &str, code: u8) -> ResolvedRecord {
        ResolvedRecord {
            candidate: CandidateRecord::new(name, "x", source),
            region: RegionResolution::Resolved {
                code,
                name: "Karnali".to_string(),
            },
            subdivision: SubdivisionResolution::Absent,
            corrections: vec![],
        }
    }

    fn rich_and_poor() -> (ResolvedRecord, ResolvedRecord) {
        let poor = resolved("Karnali Provincial Hospital", "scrape_a", 6);

        let mut rich = resolved("Karnali Provincial Hospital", "scrape_b", 6);
        rich.candidate.address = Some("Birendranagar-6, Surkhet".to_string());
        rich.candidate.phone = Some("083-520111".to_string());
        rich.candidate.position = Some(GeoPoint {
            lat: 28.6020,
            lon: 81.6360,
        });
        (poor, rich)
    }

    #[test]
    fn test_richer_record_wins_primary() {
        let merger = RecordMerger::default();
        let (poor, rich) = rich_and_poor();
        assert!(merger.completeness(&rich) > merger.completeness(&poor));

        let cluster = DuplicateCluster::new(vec![poor, rich]).unwrap();
        let canonical = merger.merge(&cluster);
        assert_eq!(canonical.sources[0], "scrape_b");
    }

    #[test]
    fn test_authoritative_source_bonus() {
        let merger = RecordMerger::default();
        let ministry = resolved("Bheri Hospital", "mohp_registry", 6);
        let scrape = resolved("Bheri Hospital", "scrape_a", 6);
        assert!(merger.completeness(&ministry) > merger.completeness(&scrape));
        assert!(merger.is_authoritative("DoHS facility list"));
        assert!(!merger.is_authoritative("newspaper_scrape"));
    }

    #[test]
    fn test_fill_from_other_members() {
        let merger = RecordMerger::default();
        let (poor, rich) = rich_and_poor();
        let mut poor = poor;
        poor.candidate.website = Some("https://karnalihospital.gov.np".to_string());

        let cluster = DuplicateCluster::new(vec![rich, poor]).unwrap();
        let canonical = merger.merge(&cluster);

        // Primary (rich) lacked a website; filled from the other member.
        assert_eq!(
            canonical.website.as_deref(),
            Some("https://karnalihospital.gov.np")
        );
        assert_eq!(canonical.address.as_deref(), Some("Birendranagar-6, Surkhet"));
        assert!(canonical.position.is_some());
    }

    #[test]
    fn test_fill_prefers_longer_value() {
        let merger = RecordMerger::default();
        let primary = resolved("Mehelkuna PHC", "hmis", 6);
        let mut a = resolved("Mehelkuna PHC", "scrape_a", 6);
        a.candidate.address = Some("Mehelkuna".to_string());
        let mut b = resolved("Mehelkuna PHC", "scrape_b", 6);
        b.candidate.address = Some("Mehelkuna, Surkhet, Karnali".to_string());

        let cluster = DuplicateCluster::new(vec![primary, a, b]).unwrap();
        let canonical = merger.merge(&cluster);
        assert_eq!(
            canonical.address.as_deref(),
            Some("Mehelkuna, Surkhet, Karnali")
        );
    }

    #[test]
    fn test_provenance_union_deduplicated() {
        let merger = RecordMerger::default();
        let a = resolved("Jumla Hospital", "scrape_a", 6);
        let b = resolved("Jumla Hospital", "scrape_a", 6);
        let c = resolved("Jumla Hospital", "scrape_b", 6);

        let cluster = DuplicateCluster::new(vec![a, b, c]).unwrap();
        let canonical = merger.merge(&cluster);
        assert_eq!(canonical.sources.len(), 2);
        assert!(!canonical.sources.is_empty());
    }

    #[test]
    fn test_merge_is_permutation_invariant() {
        let merger = RecordMerger::default();
        let (poor, rich) = rich_and_poor();
        let mut third = resolved("Karnali Provincial Hospital", "dohs_list", 6);
        third.candidate.website = Some("https://kph.gov.np".to_string());

        let members = vec![poor, rich, third];
        let permutations: Vec<Vec<ResolvedRecord>> = vec![
            vec![members[0].clone(), members[1].clone(), members[2].clone()],
            vec![members[2].clone(), members[0].clone(), members[1].clone()],
            vec![members[1].clone(), members[2].clone(), members[0].clone()],
        ];

        let mut outputs: Vec<CanonicalRecord> = permutations
            .into_iter()
            .map(|p| merger.merge(&DuplicateCluster::new(p).unwrap()))
            .collect();

        let reference = outputs.remove(0);
        for other in outputs {
            assert_eq!(other.id, reference.id);
            assert_eq!(other.name, reference.name);
            assert_eq!(other.address, reference.address);
            assert_eq!(other.phone, reference.phone);
            assert_eq!(other.website, reference.website);
            assert_eq!(other.sources, reference.sources);
        }
    }

    #[test]
    fn test_permutation_invariant_on_completeness_ties() {
        // Equal completeness, same source, no ids, same name: only the
        // address text distinguishes the members. Output must not depend
        // on which one arrives first.
        let merger = RecordMerger::default();
        let mut a = resolved("Mehelkuna PHC", "scrape_a", 6);
        a.candidate.address = Some("Ward 5 Surkhet".to_string());
        let mut b = resolved("Mehelkuna PHC", "scrape_a", 6);
        b.candidate.address = Some("Surkhet Ward 5".to_string());

        let forward = merger.merge(&DuplicateCluster::new(vec![a.clone(), b.clone()]).unwrap());
        let reverse = merger.merge(&DuplicateCluster::new(vec![b, a]).unwrap());
        assert_eq!(forward.address, reverse.address);
        assert_eq!(forward.id, reverse.id);
    }

    #[test]
    fn test_same_name_clusters_get_distinct_ids() {
        let merger = RecordMerger::default();
        let mut a = resolved("Seti Zonal Hospital", "scrape_a", 7);
        a.candidate.phone = Some("091521111".to_string());
        let mut b = resolved("Seti Zonal Hospital", "scrape_b", 7);
        b.candidate.phone = Some("091529999".to_string());

        let first = merger.merge(&DuplicateCluster::new(vec![a]).unwrap());
        let second = merger.merge(&DuplicateCluster::new(vec![b]).unwrap());
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_canonical_id_is_deterministic() {
        let merger = RecordMerger::default();
        let cluster =
            DuplicateCluster::new(vec![resolved("Mugu District Hospital", "hmis", 6)]).unwrap();
        let first = merger.merge(&cluster);
        let second = merger.merge(&cluster);
        assert_eq!(first.id, second.id);
        assert!(first.id.starts_with("HF-6-"));
    }
}
