//! What an operator reads and moves, and the estimate it produces.

use std::fmt;

use docsim_core::config::CostConfig;
use docsim_core::id::ServerId;
use serde::{Deserialize, Serialize};

use crate::cost::CostResult;
use crate::dataset::Dataset;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ServerRead {
    pub server: ServerId,
    pub bytes: f64,
}

/// Bytes read from local storage, per contacted server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IoProfile {
    pub reads: Vec<ServerRead>,
}

impl IoProfile {
    pub fn total_bytes(&self) -> f64 {
        self.reads.iter().map(|r| r.bytes).sum()
    }

    /// Servers read in parallel; the slowest one bounds the time.
    pub fn max_bytes(&self) -> f64 {
        self.reads.iter().map(|r| r.bytes).fold(0.0, f64::max)
    }

    pub fn servers_contacted(&self) -> usize {
        self.reads.len()
    }

    pub fn time_seconds(&self, config: &CostConfig) -> f64 {
        self.max_bytes() * config.disk_latency_per_byte
    }
}

/// Why bytes crossed the network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transfer {
    None,
    /// Partial results gathered on the coordinator.
    Merge,
    /// One join input repartitioned to the other's layout.
    Shuffle { moved: String },
    /// Partial aggregates exchanged in the reduce phase.
    Reduce { groups: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkProfile {
    pub bytes: f64,
    pub transfer: Transfer,
}

impl NetworkProfile {
    pub fn none() -> Self {
        Self {
            bytes: 0.0,
            transfer: Transfer::None,
        }
    }

    pub fn time_seconds(&self, config: &CostConfig) -> f64 {
        self.bytes * config.network_latency_per_byte
    }
}

/// Execution strategy picked by a cost model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    FullScan,
    IndexScan,
    ShardFullScan,
    ShardIndexScan,
    NestedLoop,
    ShardNestedLoop,
    ShuffleNestedLoop,
    LocalAggregate,
    ShardLocalAggregate,
    MapReduceAggregate,
}

impl Algorithm {
    pub fn label(self) -> &'static str {
        match self {
            Algorithm::FullScan => "Full scan",
            Algorithm::IndexScan => "Index",
            Algorithm::ShardFullScan => "Shard / Full scan",
            Algorithm::ShardIndexScan => "Shard / Index",
            Algorithm::NestedLoop => "Nested Loop",
            Algorithm::ShardNestedLoop => "Shard / Nested Loop",
            Algorithm::ShuffleNestedLoop => "Map/Reduce & Nested Loop",
            Algorithm::LocalAggregate => "Local Aggregate",
            Algorithm::ShardLocalAggregate => "Shard / Local Aggregate",
            Algorithm::MapReduceAggregate => "Map/Reduce Aggregate (Shuffle)",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Full outcome of one simulated operator: the strategy, the byte profiles
/// behind the figures, the cost, and the result to feed the next operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorEstimate {
    pub operator: String,
    pub algorithm: Algorithm,
    pub io: IoProfile,
    pub network: NetworkProfile,
    pub cost: CostResult,
    pub output: Dataset,
}
