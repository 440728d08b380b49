//! Reference geography and resolution of free-text region names.

pub mod registry;
pub mod resolver;

pub use registry::{GeographyRegistry, RegionReference, SubdivisionReference};
pub use resolver::GeographyResolver;
