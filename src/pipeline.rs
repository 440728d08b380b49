//! Batch orchestrator: ingest, resolve, partition, cluster, merge, emit.

use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{info, warn};

use crate::dedupe::{ClusterPolicy, DuplicateClusterer, RecordMerger, SimilarityConfig, SimilarityScorer};
use crate::error::DedupeError;
use crate::geography::{GeographyRegistry, GeographyResolver};
use crate::models::{
    CandidateRecord, CanonicalRecord, RejectedEntry, ResolvedRecord, RunReport, UnresolvedEntry,
};

/// One scraper collaborator's output: a labelled list of candidates.
#[derive(Debug, Clone)]
pub struct SourceBatch {
    pub source: String,
    pub records: Vec<CandidateRecord>,
}

/// Run-level tunables.
#[derive(Debug, Clone, Default)]
pub struct PipelineConfig {
    pub similarity: SimilarityConfig,
    pub policy: ClusterPolicy,
    /// Process region partitions on the rayon pool. Partitions share no
    /// mutable state, so this changes throughput only, never output.
    pub parallel: bool,
}

/// Canonical dataset plus run accounting.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub canonical: Vec<CanonicalRecord>,
    pub report: RunReport,
}

/// Single-run batch pipeline over all sources.
///
/// Re-running on unchanged input yields byte-identical canonical output
/// except for `last_updated` timestamps. A run always completes with a
/// report; per-record problems are recorded there, never thrown.
pub struct Pipeline {
    resolver: GeographyResolver,
    clusterer: DuplicateClusterer,
    merger: RecordMerger,
    parallel: bool,
}

impl Pipeline {
    pub fn new(registry: Arc<GeographyRegistry>, config: PipelineConfig) -> Result<Self, DedupeError> {
        let scorer = SimilarityScorer::new(config.similarity)?;
        Ok(Self {
            resolver: GeographyResolver::new(registry),
            clusterer: DuplicateClusterer::new(scorer, config.policy),
            merger: RecordMerger::default(),
            parallel: config.parallel,
        })
    }

    /// Pipeline over the built-in registry with default tunables.
    pub fn with_defaults() -> Result<Self, DedupeError> {
        Self::new(
            Arc::new(GeographyRegistry::nepal()?),
            PipelineConfig::default(),
        )
    }

    pub fn run(&self, batches: Vec<SourceBatch>) -> PipelineOutput {
        let mut report = RunReport::default();
        let mut partitions: BTreeMap<u8, Vec<ResolvedRecord>> = BTreeMap::new();

        // Ingest + resolve.
        for batch in batches {
            info!("ingesting {} records from {}", batch.records.len(), batch.source);
            for mut candidate in batch.records {
                report.total_in += 1;

                if candidate.source_label.trim().is_empty() {
                    candidate.source_label = batch.source.clone();
                }

                if candidate.name.trim().is_empty() {
                    report.rejected.push(RejectedEntry {
                        source_label: candidate.source_label.clone(),
                        reason: "missing required name".to_string(),
                    });
                    continue;
                }

                let resolved = self.resolver.resolve(candidate);
                match resolved.region_code() {
                    Some(code) => partitions.entry(code).or_default().push(resolved),
                    None => report.unresolved.push(UnresolvedEntry {
                        original_region_text: resolved.candidate.region_text.clone(),
                        original_subdivision_text: resolved.candidate.subdivision_text.clone(),
                        source_label: resolved.candidate.source_label.clone(),
                    }),
                }
            }
        }

        report.resolved_count = partitions.values().map(Vec::len).sum();
        if !report.unresolved.is_empty() {
            warn!(
                "{} records had unresolvable regions and were excluded from clustering",
                report.unresolved.len()
            );
        }

        // Cluster + merge, per region partition. BTreeMap iteration and
        // rayon's ordered collect keep the output order stable.
        let partitions: Vec<(u8, Vec<ResolvedRecord>)> = partitions.into_iter().collect();
        let per_partition: Vec<(usize, usize, Vec<CanonicalRecord>)> = if self.parallel {
            partitions
                .into_par_iter()
                .map(|(_, records)| self.process_partition(records))
                .collect()
        } else {
            partitions
                .into_iter()
                .map(|(_, records)| self.process_partition(records))
                .collect()
        };

        let mut canonical = Vec::new();
        for (clusters, merged, mut records) in per_partition {
            report.clusters_found += clusters;
            report.records_merged += merged;
            canonical.append(&mut records);
        }
        report.final_count = canonical.len();

        info!(
            "run complete: {} in, {} resolved, {} unresolved, {} rejected, {} clusters, {} canonical",
            report.total_in,
            report.resolved_count,
            report.unresolved.len(),
            report.rejected.len(),
            report.clusters_found,
            report.final_count
        );

        PipelineOutput { canonical, report }
    }

    /// Returns (clusters found, records absorbed, canonical records).
    fn process_partition(
        &self,
        records: Vec<ResolvedRecord>,
    ) -> (usize, usize, Vec<CanonicalRecord>) {
        let clusters = self.clusterer.cluster_partition(records);
        let found = clusters.len();
        let absorbed = clusters.iter().map(|c| c.len() - 1).sum();
        let canonical = clusters.iter().map(|c| self.merger.merge(c)).collect();
        (found, absorbed, canonical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline::with_defaults().unwrap()
    }

    fn batch(source: &str, records: Vec<CandidateRecord>) -> SourceBatch {
        SourceBatch {
            source: source.to_string(),
            records,
        }
    }

    #[test]
    fn test_near_duplicates_merge_with_phone_fill() {
        let a = CandidateRecord::new("Central Hospital", "Karnali", "scrape_a");
        let mut b = CandidateRecord::new("Central Hospital Main", "karnali", "scrape_b");
        b.phone = Some("+977-83-520111".to_string());

        let output = pipeline().run(vec![batch("scrape_a", vec![a]), batch("scrape_b", vec![b])]);

        assert_eq!(output.canonical.len(), 1);
        let record = &output.canonical[0];
        assert!(record.phone.is_some());
        assert_eq!(record.sources.len(), 2);
        assert_eq!(record.region_code, 6);
        assert_eq!(output.report.records_merged, 1);
    }

    #[test]
    fn test_unresolved_region_goes_to_report_only() {
        let record = CandidateRecord::new("Ghost Clinic", "Nonexistent Region", "scrape_a");
        let output = pipeline().run(vec![batch("scrape_a", vec![record])]);

        assert!(output.canonical.is_empty());
        assert_eq!(output.report.unresolved.len(), 1);
        assert_eq!(
            output.report.unresolved[0].original_region_text,
            "Nonexistent Region"
        );
        assert_eq!(output.report.resolved_count, 0);
    }

    #[test]
    fn test_same_name_different_regions_never_merge() {
        let a = CandidateRecord::new("District Hospital", "Gandaki", "scrape_a");
        let b = CandidateRecord::new("District Hospital", "Lumbini", "scrape_a");
        let output = pipeline().run(vec![batch("scrape_a", vec![a, b])]);

        assert_eq!(output.canonical.len(), 2);
        let codes: Vec<u8> = output.canonical.iter().map(|c| c.region_code).collect();
        assert_eq!(codes, vec![4, 5]);
    }

    #[test]
    fn test_missing_name_rejected_run_continues() {
        let bad = CandidateRecord::new("  ", "Bagmati", "scrape_a");
        let good = CandidateRecord::new("Bir Hospital", "Bagmati", "scrape_a");
        let output = pipeline().run(vec![batch("scrape_a", vec![bad, good])]);

        assert_eq!(output.report.total_in, 2);
        assert_eq!(output.report.rejected.len(), 1);
        assert_eq!(output.report.rejected[0].reason, "missing required name");
        assert_eq!(output.canonical.len(), 1);
    }

    #[test]
    fn test_empty_input_still_reports() {
        let output = pipeline().run(vec![]);
        assert!(output.canonical.is_empty());
        assert_eq!(output.report.total_in, 0);
        assert_eq!(output.report.final_count, 0);
    }

    #[test]
    fn test_blank_source_label_stamped_from_batch() {
        let mut record = CandidateRecord::new("Patan Hospital", "Bagmati", "");
        record.source_label = String::new();
        let output = pipeline().run(vec![batch("lalitpur_scrape", vec![record])]);
        assert_eq!(output.canonical[0].sources, vec!["lalitpur_scrape"]);
    }

    #[test]
    fn test_split_clusters_keep_distinct_ids() {
        // Pass-order greedy clustering splits a name-identical chain with
        // conflicting phones into two clusters; their canonical ids must
        // still differ so downstream stores keyed by id keep both.
        let mut a = CandidateRecord::new("Seti Zonal Hospital", "Sudurpashchim", "s");
        a.phone = Some("091521111".to_string());
        let b = CandidateRecord::new("Seti Zonal Hospital", "Sudurpashchim", "s");
        let mut c = CandidateRecord::new("Seti Zonal Hospital", "Sudurpashchim", "s");
        c.phone = Some("091529999".to_string());

        let output = pipeline().run(vec![batch("s", vec![a, b, c])]);
        assert_eq!(output.canonical.len(), 2);
        assert_ne!(output.canonical[0].id, output.canonical[1].id);
    }

    #[test]
    fn test_rerun_is_idempotent_apart_from_timestamps() {
        let records = || {
            vec![batch(
                "scrape_a",
                vec![
                    CandidateRecord::new("Central Hospital", "Karnali", "scrape_a"),
                    CandidateRecord::new("Central Hospital Main", "karnali", "scrape_a"),
                    CandidateRecord::new("Bir Hospital", "Bagmati", "scrape_a"),
                ],
            )]
        };

        let first = pipeline().run(records());
        let second = pipeline().run(records());

        assert_eq!(first.canonical.len(), second.canonical.len());
        for (a, b) in first.canonical.iter().zip(second.canonical.iter()) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.name, b.name);
            assert_eq!(a.sources, b.sources);
        }
    }

    #[test]
    fn test_parallel_matches_serial_output() {
        let records = vec![
            CandidateRecord::new("Koshi Hospital", "Koshi", "s"),
            CandidateRecord::new("Janakpur Hospital", "Madhesh", "s"),
            CandidateRecord::new("Bir Hospital", "Bagmati", "s"),
            CandidateRecord::new("Pokhara Hospital", "Gandaki", "s"),
        ];

        let registry = Arc::new(GeographyRegistry::nepal().unwrap());
        let serial = Pipeline::new(registry.clone(), PipelineConfig::default())
            .unwrap()
            .run(vec![batch("s", records.clone())]);
        let parallel = Pipeline::new(
            registry,
            PipelineConfig {
                parallel: true,
                ..PipelineConfig::default()
            },
        )
        .unwrap()
        .run(vec![batch("s", records)]);

        let ids = |out: &PipelineOutput| -> Vec<String> {
            out.canonical.iter().map(|c| c.id.clone()).collect()
        };
        assert_eq!(ids(&serial), ids(&parallel));
    }
}
