use thiserror::Error;

/// Errors surfaced by the resolution and deduplication core.
///
/// Per-record problems (unresolvable geography, missing names, bad
/// coordinates) are never errors; they are routed into the [`RunReport`].
/// This enum covers construction-time misuse only.
///
/// [`RunReport`]: crate::models::RunReport
#[derive(Debug, Error)]
pub enum DedupeError {
    /// Reference geography failed validation at load time.
    #[error("registry: {0}")]
    Registry(String),

    /// A cluster violated its invariants (empty, or mixed region codes).
    #[error("invalid cluster: {0}")]
    Cluster(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}
