//! Fuzzy identity resolution: scoring, clustering and merging.

pub mod cluster;
pub mod merge;
pub mod similarity;

pub use cluster::{ClusterPolicy, DuplicateClusterer};
pub use merge::RecordMerger;
pub use similarity::{haversine_km, SimilarityConfig, SimilarityScorer, DEFAULT_THRESHOLD};
