//! Groups a region partition of resolved records into duplicate clusters.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::similarity::SimilarityScorer;
use crate::models::{DuplicateCluster, ResolvedRecord};

/// How clusters grow when similarity is not transitive.
///
/// With records A, B, C where A~B and B~C clear the threshold but A~C does
/// not, `PassOrderGreedy` yields `{A, B}` and `{C}` while
/// `TransitiveClosure` yields `{A, B, C}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterPolicy {
    /// Single pass in stable input order: each unclustered record seeds a
    /// cluster and absorbs every remaining record it matches directly.
    /// Keeps cluster growth bounded; the default.
    #[default]
    PassOrderGreedy,
    /// Grow each cluster until no remaining record matches any member.
    TransitiveClosure,
}

/// Per-partition duplicate grouping.
///
/// Callers must hand in one region partition at a time; the scorer's region
/// gate makes cross-region matches impossible regardless, but partitioning
/// first keeps the pairwise comparison count small.
#[derive(Debug, Clone)]
pub struct DuplicateClusterer {
    scorer: SimilarityScorer,
    policy: ClusterPolicy,
}

impl DuplicateClusterer {
    pub fn new(scorer: SimilarityScorer, policy: ClusterPolicy) -> Self {
        Self { scorer, policy }
    }

    pub fn policy(&self) -> ClusterPolicy {
        self.policy
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Cluster one region partition. Input order is preserved into seeds,
    /// so the result is deterministic for a given input order.
    pub fn cluster_partition(&self, records: Vec<ResolvedRecord>) -> Vec<DuplicateCluster> {
        let n = records.len();
        let clusters = match self.policy {
            ClusterPolicy::PassOrderGreedy => self.greedy(records),
            ClusterPolicy::TransitiveClosure => self.transitive(records),
        };
        debug!(
            "clustered {} records into {} clusters ({:?})",
            n,
            clusters.len(),
            self.policy
        );
        clusters
    }

    fn greedy(&self, records: Vec<ResolvedRecord>) -> Vec<DuplicateCluster> {
        let mut taken = vec![false; records.len()];
        let mut clusters = Vec::new();

        for i in 0..records.len() {
            if taken[i] {
                continue;
            }
            taken[i] = true;
            let mut members = vec![records[i].clone()];

            for j in (i + 1)..records.len() {
                if taken[j] {
                    continue;
                }
                if self.scorer.is_duplicate(&records[i], &records[j]) {
                    taken[j] = true;
                    members.push(records[j].clone());
                }
            }

            clusters.push(DuplicateCluster::from_partition_members(members));
        }

        clusters
    }

    /// Grow-until-stable connectivity grouping: keep sweeping the remaining
    /// records, pulling in any that match any current member.
    fn transitive(&self, records: Vec<ResolvedRecord>) -> Vec<DuplicateCluster> {
        let mut remaining = records;
        let mut clusters = Vec::new();

        while !remaining.is_empty() {
            let mut members = vec![remaining.remove(0)];
            let mut changed = true;

            while changed && !remaining.is_empty() {
                changed = false;
                for i in (0..remaining.len()).rev() {
                    let matches = members
                        .iter()
                        .any(|m| self.scorer.is_duplicate(m, &remaining[i]));
                    if matches {
                        members.push(remaining.remove(i));
                        changed = true;
                    }
                }
            }

            clusters.push(DuplicateCluster::from_partition_members(members));
        }

        clusters
    }
}
