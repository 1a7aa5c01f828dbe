//! Scenario reports.

use docsim_cluster::ShardingStats;
use docsim_core::hash::Hash256;
use docsim_operators::CostResult;
use docsim_planner::QueryEstimate;
use docsim_size::DatabaseSizeReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique per produced report; two runs of the same inputs share a
/// fingerprint but never an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    pub fn new() -> Self {
        ReportId(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryReport {
    pub name: String,
    /// Rendered plan, e.g. `join(aggregate(OrderLine, [IDP]), Product, IDP)`.
    pub plan: String,
    pub estimate: QueryEstimate,
}

impl QueryReport {
    /// Algorithm labels of every step, children first.
    pub fn algorithms(&self) -> Vec<&'static str> {
        self.estimate
            .steps
            .iter()
            .map(|s| s.algorithm.label())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub id: ReportId,
    pub scenario: String,
    /// Simulator version for provenance.
    pub version: String,
    /// Stable hash of the scenario and cost coefficients.
    pub fingerprint: Hash256,
    pub size: DatabaseSizeReport,
    /// One entry per sharded collection, in name order.
    pub sharding: Vec<ShardingStats>,
    pub queries: Vec<QueryReport>,
}

impl ScenarioReport {
    pub fn query(&self, name: &str) -> Option<&QueryReport> {
        self.queries.iter().find(|q| q.name == name)
    }

    pub fn sharding_of(&self, collection: &str) -> Option<&ShardingStats> {
        self.sharding.iter().find(|s| s.collection == collection)
    }

    /// Every query run once.
    pub fn total(&self) -> CostResult {
        self.queries.iter().map(|q| q.estimate.total).sum()
    }

    /// Equal figures, ignoring the report id.
    pub fn same_results(&self, other: &ScenarioReport) -> bool {
        self.scenario == other.scenario
            && self.fingerprint == other.fingerprint
            && self.size == other.size
            && self.sharding == other.sharding
            && self.queries == other.queries
    }
}
