//! Maps free-text province/district strings onto the official taxonomy.

use std::sync::Arc;

use strsim::jaro_winkler;
use tracing::debug;

use super::registry::GeographyRegistry;
use crate::models::{
    CandidateRecord, RegionResolution, ResolvedRecord, SubdivisionResolution,
};
use crate::normalize::{fold_ascii, normalize};

/// Minimum common-prefix length before a prefix match is trusted.
const MIN_PREFIX_OVERLAP: usize = 4;
/// Jaro-Winkler floor for the bounded fuzzy step.
const FUZZY_THRESHOLD: f64 = 0.92;

/// How a lookup succeeded; drives the correction notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchTier {
    Exact,
    Alias,
    Fuzzy,
    Folded,
}

impl MatchTier {
    fn label(self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::Alias => "alias",
            MatchTier::Fuzzy => "fuzzy",
            MatchTier::Folded => "transliteration",
        }
    }
}

/// Resolution service over a loaded [`GeographyRegistry`].
///
/// Lookup order is exact, alias, bounded prefix/fuzzy, ASCII-folded.
/// Nothing is ever defaulted: input that matches no tier stays Unresolved
/// with the original text intact.
#[derive(Debug, Clone)]
pub struct GeographyResolver {
    registry: Arc<GeographyRegistry>,
}

impl GeographyResolver {
    pub fn new(registry: Arc<GeographyRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &GeographyRegistry {
        &self.registry
    }

    /// Resolve a free-text region name to an official code.
    pub fn resolve_region(&self, text: &str) -> RegionResolution {
        match self.region_match(text) {
            Some((code, _)) => {
                // Code comes from the registry's own tables.
                let name = self
                    .registry
                    .region_by_code(code)
                    .map(|r| r.name.to_string())
                    .unwrap_or_default();
                RegionResolution::Resolved { code, name }
            }
            None => {
                debug!("unresolved region text: {:?}", text);
                RegionResolution::Unresolved {
                    original: text.to_string(),
                }
            }
        }
    }

    /// Resolve a free-text district name, scoped to `region_code` when known.
    ///
    /// Without a region the whole district universe is searched and the
    /// first hit in (region code, name) order wins; identically named
    /// districts in different regions are not disambiguated further.
    pub fn resolve_subdivision(
        &self,
        text: &str,
        region_code: Option<u8>,
    ) -> SubdivisionResolution {
        match self.subdivision_match(text, region_code) {
            Some((name, _)) => SubdivisionResolution::Resolved { name },
            None => {
                debug!("unresolved subdivision text: {:?}", text);
                SubdivisionResolution::Unresolved {
                    original: text.to_string(),
                }
            }
        }
    }

    /// Resolve a full candidate, recording a correction note for every
    /// non-exact substitution applied.
    pub fn resolve(&self, candidate: CandidateRecord) -> ResolvedRecord {
        let mut corrections = Vec::new();

        let region = match self.region_match(&candidate.region_text) {
            Some((code, tier)) => {
                let name = self
                    .registry
                    .region_by_code(code)
                    .map(|r| r.name.to_string())
                    .unwrap_or_default();
                if tier != MatchTier::Exact {
                    corrections.push(format!(
                        "region {:?} -> {:?} ({})",
                        candidate.region_text,
                        name,
                        tier.label()
                    ));
                }
                RegionResolution::Resolved { code, name }
            }
            None => RegionResolution::Unresolved {
                original: candidate.region_text.clone(),
            },
        };

        let subdivision = match &candidate.subdivision_text {
            None => SubdivisionResolution::Absent,
            Some(text) if text.trim().is_empty() => SubdivisionResolution::Absent,
            Some(text) => match self.subdivision_match(text, region.code()) {
                Some((name, tier)) => {
                    if tier != MatchTier::Exact {
                        corrections.push(format!(
                            "subdivision {:?} -> {:?} ({})",
                            text,
                            name,
                            tier.label()
                        ));
                    }
                    SubdivisionResolution::Resolved { name }
                }
                None => SubdivisionResolution::Unresolved {
                    original: text.clone(),
                },
            },
        };

        ResolvedRecord {
            candidate,
            region,
            subdivision,
            corrections,
        }
    }

    fn region_match(&self, text: &str) -> Option<(u8, MatchTier)> {
        let norm = normalize(text);
        if norm.is_empty() {
            return None;
        }

        if let Some(code) = self.registry.region_exact(&norm) {
            return Some((code, MatchTier::Exact));
        }
        if let Some(code) = self.registry.region_alias(&norm) {
            return Some((code, MatchTier::Alias));
        }

        let candidates: Vec<(String, u8)> = self
            .registry
            .regions()
            .iter()
            .map(|r| (normalize(r.name), r.code))
            .collect();
        if let Some(code) = fuzzy_match(&norm, &candidates) {
            return Some((code, MatchTier::Fuzzy));
        }

        let folded = fold_ascii(text);
        if !folded.is_empty() && folded != norm {
            if let Some(code) = self.registry.region_folded(&folded) {
                return Some((code, MatchTier::Folded));
            }
        }

        None
    }

    fn subdivision_match(
        &self,
        text: &str,
        region_code: Option<u8>,
    ) -> Option<(String, MatchTier)> {
        let norm = normalize(text);
        if norm.is_empty() {
            return None;
        }

        if let Some(sub) = self.registry.sub_exact(&norm, region_code) {
            return Some((sub.name.to_string(), MatchTier::Exact));
        }
        if let Some(sub) = self.registry.sub_alias(&norm, region_code) {
            return Some((sub.name.to_string(), MatchTier::Alias));
        }

        let candidates: Vec<(String, &str)> = self
            .registry
            .subdivisions()
            .iter()
            .filter(|s| region_code.map_or(true, |code| s.region_code == code))
            .map(|s| (normalize(s.name), s.name))
            .collect();
        if let Some(name) = fuzzy_match(&norm, &candidates) {
            return Some((name.to_string(), MatchTier::Fuzzy));
        }

        let folded = fold_ascii(text);
        if !folded.is_empty() && folded != norm {
            if let Some(sub) = self.registry.sub_folded(&folded, region_code) {
                return Some((sub.name.to_string(), MatchTier::Folded));
            }
        }

        None
    }
}

/// Bounded fuzzy lookup: accept a prefix relationship with at least
/// [`MIN_PREFIX_OVERLAP`] shared characters, otherwise the best
/// Jaro-Winkler score at or above [`FUZZY_THRESHOLD`].
fn fuzzy_match<T: Copy>(needle: &str, candidates: &[(String, T)]) -> Option<T> {
    for (canonical, value) in candidates {
        let shorter = needle.len().min(canonical.len());
        if shorter >= MIN_PREFIX_OVERLAP
            && (needle.starts_with(canonical.as_str()) || canonical.starts_with(needle))
        {
            return Some(*value);
        }
    }

    let mut best: Option<(f64, T)> = None;
    for (canonical, value) in candidates {
        let score = jaro_winkler(needle, canonical);
        if score >= FUZZY_THRESHOLD && best.map_or(true, |(b, _)| score > b) {
            best = Some((score, *value));
        }
    }
    best.map(|(_, value)| value)
}
