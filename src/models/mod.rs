pub mod candidate;
pub mod canonical;
pub mod report;

pub use candidate::{
    CandidateRecord, GeoPoint, RegionResolution, ResolvedRecord, SubdivisionResolution,
};
pub use canonical::{CanonicalRecord, DuplicateCluster};
pub use report::{RejectedEntry, RunReport, UnresolvedEntry};
