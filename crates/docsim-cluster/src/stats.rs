//! Per-plan summary figures: how evenly a collection spreads.

use docsim_core::id::ServerId;
use serde::{Deserialize, Serialize};

use crate::distribute::ShardingPlan;
use crate::topology::Cluster;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingStats {
    pub collection: String,
    pub servers: usize,
    pub total_documents: u64,
    pub total_bytes: f64,
    /// Mean documents per server.
    pub docs_per_server: f64,
    /// Mean distinct shard-key values per server.
    pub distinct_values_per_server: f64,
    pub max_documents: u64,
    pub min_documents: u64,
    pub max_bytes: f64,
    /// `max_documents / docs_per_server`; 1.0 is perfectly balanced.
    pub imbalance: f64,
    /// Servers whose shard is larger than their storage capacity. Filled by
    /// `on_cluster`.
    #[serde(default)]
    pub over_capacity: Vec<ServerId>,
    /// `total_bytes` over the cluster's total storage, when known.
    #[serde(default)]
    pub storage_used: Option<f64>,
}

impl ShardingStats {
    pub fn from_plan(plan: &ShardingPlan) -> Self {
        let servers = plan.shards.len();
        let total_documents = plan.total_documents();
        let max_documents = plan.shards.iter().map(|s| s.documents).max().unwrap_or(0);
        let min_documents = plan.shards.iter().map(|s| s.documents).min().unwrap_or(0);
        let (docs_per_server, distinct_values_per_server) = if servers == 0 {
            (0.0, 0.0)
        } else {
            let n = servers as f64;
            let distinct: f64 = plan.shards.iter().map(|s| s.distinct_key_values).sum();
            (total_documents as f64 / n, distinct / n)
        };
        let imbalance = if docs_per_server > 0.0 {
            max_documents as f64 / docs_per_server
        } else {
            1.0
        };
        Self {
            collection: plan.collection.clone(),
            servers,
            total_documents,
            total_bytes: plan.total_bytes(),
            docs_per_server,
            distinct_values_per_server,
            max_documents,
            min_documents,
            max_bytes: plan.max_shard_bytes(),
            imbalance,
            over_capacity: Vec::new(),
            storage_used: None,
        }
    }

    /// `from_plan` plus the storage check against `cluster`'s servers.
    pub fn on_cluster(plan: &ShardingPlan, cluster: &Cluster) -> Self {
        let mut stats = Self::from_plan(plan);
        stats.over_capacity = cluster
            .capacities()
            .into_iter()
            .filter(|(id, capacity)| {
                plan.shard(*id)
                    .map_or(false, |s| s.bytes > *capacity as f64)
            })
            .map(|(id, _)| id)
            .collect();
        let total = cluster.total_capacity_bytes();
        stats.storage_used = (total > 0).then(|| stats.total_bytes / total as f64);
        stats
    }

    pub fn fits(&self) -> bool {
        self.over_capacity.is_empty()
    }
}
