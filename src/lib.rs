//! Deodar - geographic entity resolution and deduplication for health
//! facility listings.
//!
//! This library turns noisy, independently scraped facility listings into
//! one canonical record per physical institution, tagged with official
//! administrative-geography codes.

pub mod dedupe;
pub mod error;
pub mod geography;
pub mod models;
pub mod normalize;
pub mod pipeline;

pub use dedupe::{
    ClusterPolicy, DuplicateClusterer, RecordMerger, SimilarityConfig, SimilarityScorer,
};
pub use error::DedupeError;
pub use geography::{GeographyRegistry, GeographyResolver};
pub use models::{CandidateRecord, CanonicalRecord, ResolvedRecord, RunReport};
pub use pipeline::{Pipeline, PipelineConfig, PipelineOutput, SourceBatch};
