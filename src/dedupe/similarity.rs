//! Duplicate-likelihood scoring between two geography-resolved records.

use strsim::normalized_levenshtein;

use crate::error::DedupeError;
use crate::models::{GeoPoint, ResolvedRecord};
use crate::normalize::{normalize, normalize_phone, token_set};

/// Default duplicate threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.85;

// Composite weights per feature.
const NAME_WEIGHT: f64 = 0.4;
const ADDRESS_WEIGHT: f64 = 0.2;
const TYPE_WEIGHT: f64 = 0.2;
const PHONE_WEIGHT: f64 = 0.2;

// Blend inside a text-similarity feature.
const EDIT_WEIGHT: f64 = 0.6;
const TOKEN_WEIGHT: f64 = 0.4;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Tunables for the scorer.
#[derive(Debug, Clone)]
pub struct SimilarityConfig {
    /// Scores at or above this are duplicates.
    pub threshold: f64,
    /// Coordinates closer than this earn the bonus.
    pub near_distance_km: f64,
    /// Coordinates further than this take the penalty.
    pub far_distance_km: f64,
    pub coord_bonus: f64,
    pub coord_penalty: f64,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            near_distance_km: 1.0,
            far_distance_km: 10.0,
            coord_bonus: 0.10,
            coord_penalty: 0.20,
        }
    }
}

impl SimilarityConfig {
    pub fn validate(&self) -> Result<(), DedupeError> {
        if !(0.0..=1.0).contains(&self.threshold) || self.threshold == 0.0 {
            return Err(DedupeError::Config(format!(
                "threshold must be in (0, 1], got {}",
                self.threshold
            )));
        }
        if self.far_distance_km <= self.near_distance_km {
            return Err(DedupeError::Config(
                "far_distance_km must exceed near_distance_km".to_string(),
            ));
        }
        Ok(())
    }
}

/// Computes a duplicate-likelihood score in [0, 1] for record pairs.
///
/// Records resolved to different regions score 0 unconditionally (the
/// region gate); cross-region duplicates are impossible by construction.
/// Missing fields never vote against a match: a feature absent on either
/// side contributes its full weight, so sparse listings can still clear
/// the threshold on name evidence alone.
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    config: SimilarityConfig,
}

impl SimilarityScorer {
    pub fn new(config: SimilarityConfig) -> Result<Self, DedupeError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Composite score, clamped to [0, 1].
    pub fn score(&self, a: &ResolvedRecord, b: &ResolvedRecord) -> f64 {
        // Region gate.
        match (a.region_code(), b.region_code()) {
            (Some(ca), Some(cb)) if ca == cb => {}
            _ => return 0.0,
        }

        let name = text_similarity(&a.candidate.name, &b.candidate.name);
        let address = optional_text_similarity(
            a.candidate.address.as_deref(),
            b.candidate.address.as_deref(),
        );
        let type_match = binary_match(
            non_empty(&a.candidate.facility_type),
            non_empty(&b.candidate.facility_type),
            |x, y| normalize(x) == normalize(y),
        );
        let phone_match = binary_match(
            a.candidate.phone.as_deref(),
            b.candidate.phone.as_deref(),
            |x, y| match (normalize_phone(x), normalize_phone(y)) {
                (Some(px), Some(py)) => px == py,
                // Unusable digits on either side: no evidence either way.
                _ => true,
            },
        );

        let mut score = NAME_WEIGHT * name
            + ADDRESS_WEIGHT * address
            + TYPE_WEIGHT * type_match
            + PHONE_WEIGHT * phone_match;

        if let (Some(pa), Some(pb)) = (&a.candidate.position, &b.candidate.position) {
            let distance = haversine_km(pa, pb);
            if distance <= self.config.near_distance_km {
                score += self.config.coord_bonus;
            } else if distance > self.config.far_distance_km {
                score -= self.config.coord_penalty;
            }
        }

        score.clamp(0.0, 1.0)
    }

    pub fn is_duplicate(&self, a: &ResolvedRecord, b: &ResolvedRecord) -> bool {
        self.score(a, b) >= self.config.threshold
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            config: SimilarityConfig::default(),
        }
    }
}

/// 60/40 blend of character-level edit distance and token-set overlap,
/// both over normalized text.
fn text_similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    if na.is_empty() || nb.is_empty() {
        return 0.0;
    }

    let edit = normalized_levenshtein(&na, &nb);

    let ta = token_set(a);
    let tb = token_set(b);
    let intersection = ta.iter().filter(|t| tb.contains(*t)).count();
    let union = ta.len() + tb.len() - intersection;
    let tokens = if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    };

    EDIT_WEIGHT * edit + TOKEN_WEIGHT * tokens
}

fn optional_text_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    match (a, b) {
        (Some(x), Some(y)) if !x.trim().is_empty() && !y.trim().is_empty() => {
            text_similarity(x, y)
        }
        _ => 1.0,
    }
}

fn binary_match(a: Option<&str>, b: Option<&str>, eq: impl Fn(&str, &str) -> bool) -> f64 {
    match (a, b) {
        (Some(x), Some(y)) => {
            if eq(x, y) {
                1.0
            } else {
                0.0
            }
        }
        _ => 1.0,
    }
}

fn non_empty(s: &str) -> Option<&str> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

/// Great-circle distance via the haversine formula.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRecord, RegionResolution, SubdivisionResolution};

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
    fn test_region_gate_forces_zero() {
        let scorer = SimilarityScorer::default();
        let a = resolved("Central Hospital", 1);
        let b = resolved("Central Hospital", 2);
        assert_eq!(scorer.score(&a, &b), 0.0);
        assert!(!scorer.is_duplicate(&a, &b));
    }

    #[test]
    fn test_unresolved_region_scores_zero() {
        let scorer = SimilarityScorer::default();
        let a = resolved("Central Hospital", 1);
        let mut b = resolved("Central Hospital", 1);
        b.region = RegionResolution::Unresolved {
            original: "???".to_string(),
        };
        assert_eq!(scorer.score(&a, &b), 0.0);
    }

    #[test]
    fn test_identical_records_score_one() {
        let scorer = SimilarityScorer::default();
        let a = resolved("Bir Hospital", 3);
        assert_eq!(scorer.score(&a, &a.clone()), 1.0);
    }

    #[test]
    fn test_near_duplicate_names_clear_threshold() {
        let scorer = SimilarityScorer::default();
        let a = resolved("Central Hospital", 6);
        let mut b = resolved("Central Hospital Main", 6);
        b.candidate.phone = Some("+900000000".to_string());
        assert!(scorer.is_duplicate(&a, &b));
    }

    #[test]
    fn test_different_names_below_threshold() {
        let scorer = SimilarityScorer::default();
        let a = resolved("Central Hospital", 6);
        let b = resolved("District Ayurveda Clinic", 6);
        assert!(!scorer.is_duplicate(&a, &b));
    }

    #[test]
    fn test_conflicting_phone_counts_against() {
        let scorer = SimilarityScorer::default();
        let mut a = resolved("Central Hospital", 6);
        let mut b = resolved("Central Hospital", 6);
        a.candidate.phone = Some("9841111111".to_string());
        b.candidate.phone = Some("9842222222".to_string());
        assert!(!scorer.is_duplicate(&a, &b));
    }

    #[test]
    fn test_coordinate_bonus_and_penalty() {
        let scorer = SimilarityScorer::default();
        let kathmandu = GeoPoint {
            lat: 27.7172,
            lon: 85.3240,
        };
        let nearby = GeoPoint {
            lat: 27.7180,
            lon: 85.3248,
        };
        let pokhara = GeoPoint {
            lat: 28.2096,
            lon: 83.9856,
        };

        let mut a = resolved("Model Hospital", 3);
        let mut b = resolved("Model Hospital Kathmandu", 3);
        a.candidate.position = Some(kathmandu);

        b.candidate.position = Some(nearby);
        let boosted = scorer.score(&a, &b);
        b.candidate.position = Some(pokhara);
        let penalized = scorer.score(&a, &b);
        b.candidate.position = None;
        let neutral = scorer.score(&a, &b);

        assert!(boosted > neutral);
        assert!(penalized < neutral);
    }

    #[test]
    fn test_score_is_clamped() {
        let scorer = SimilarityScorer::default();
        let point = GeoPoint {
            lat: 27.7,
            lon: 85.3,
        };
        let mut a = resolved("Bir Hospital", 3);
        a.candidate.position = Some(point);
        let b = a.clone();
        assert_eq!(scorer.score(&a, &b), 1.0);
    }

    #[test]
    fn test_haversine_known_distance() {
        // Kathmandu to Pokhara is roughly 145 km.
        let ktm = GeoPoint {
            lat: 27.7172,
            lon: 85.3240,
        };
        let pkr = GeoPoint {
            lat: 28.2096,
            lon: 83.9856,
        };
        let d = haversine_km(&ktm, &pkr);
        assert!((140.0..150.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SimilarityConfig::default();
        config.threshold = 0.0;
        assert!(SimilarityScorer::new(config).is_err());

        let mut config = SimilarityConfig::default();
        config.far_distance_km = 0.5;
        assert!(SimilarityScorer::new(config).is_err());
    }
}
