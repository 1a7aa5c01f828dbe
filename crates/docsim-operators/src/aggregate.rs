//! Two-phase (map/reduce) aggregate cost model.
//!
//! Map: every server scans its whole shard and builds partial groups.
//! Reduce: partial groups are exchanged, `groups x group_size` bytes, unless
//! the data is sharded by exactly the group-by fields (each group already
//! lives on one server) or only one server holds data.

use docsim_cluster::{Cluster, ShardingPolicy};
use docsim_core::config::CostConfig;
use docsim_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::CostResult;
use crate::dataset::{spread_like, Dataset, Partitioning, PlacedCollection, Slice};
use crate::plan::{Algorithm, IoProfile, NetworkProfile, OperatorEstimate, ServerRead, Transfer};
use crate::traits::CostModel;

/// Bytes of one aggregated output document (group key + accumulators).
pub const DEFAULT_GROUP_SIZE: f64 = 100.0;

/// Share of the input assumed to form distinct groups when nothing better
/// is known.
const FALLBACK_GROUP_RATIO: f64 = 0.1;

fn default_group_size() -> f64 {
    DEFAULT_GROUP_SIZE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateParams {
    pub group_by: Vec<String>,
    /// Known number of groups. Estimated from statistics when absent.
    #[serde(default)]
    pub groups: Option<f64>,
    #[serde(default = "default_group_size")]
    pub group_size: f64,
    #[serde(default)]
    pub is_sharded: bool,
}

impl AggregateParams {
    pub fn new<I, S>(group_by: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            group_by: group_by.into_iter().map(Into::into).collect(),
            groups: None,
            group_size: DEFAULT_GROUP_SIZE,
            is_sharded: false,
        }
    }

    pub fn with_groups(mut self, groups: f64) -> Self {
        self.groups = Some(groups);
        self
    }

    pub fn with_group_size(mut self, bytes: f64) -> Self {
        self.group_size = bytes;
        self
    }

    pub fn sharded(mut self, is_sharded: bool) -> Self {
        self.is_sharded = is_sharded;
        self
    }
}

#[derive(Debug, Clone)]
pub struct AggregateCost<'a> {
    input: &'a Dataset,
    group_by: Vec<String>,
    groups: f64,
    group_size: f64,
    on_group_key: bool,
    single_server: bool,
}

impl<'a> AggregateCost<'a> {
    pub fn new(input: &'a Dataset, params: &AggregateParams) -> Result<Self> {
        for f in &params.group_by {
            if !input.has_field(f) {
                return Err(Error::Schema(format!(
                    "aggregate on '{}': no field '{f}'",
                    input.name
                )));
            }
        }
        if let Some(g) = params.groups {
            if !g.is_finite() || g < 0.0 {
                return Err(Error::Parameter(format!(
                    "aggregate on '{}': group count {g} must be non-negative",
                    input.name
                )));
            }
        }
        if !params.group_size.is_finite() || params.group_size < 0.0 {
            return Err(Error::Parameter(format!(
                "aggregate on '{}': group size {} must be non-negative",
                input.name, params.group_size
            )));
        }

        let groups = params
            .groups
            .unwrap_or_else(|| estimate_groups(input, &params.group_by));
        let on_group_key = params.is_sharded
            && !params.group_by.is_empty()
            && input.partitioned_on(params.group_by.as_slice());
        let single_server = input.occupied().count() <= 1;

        debug!(
            dataset = %input.name,
            groups,
            on_group_key,
            single_server,
            "aggregate strategy"
        );

        Ok(Self {
            input,
            group_by: params.group_by.clone(),
            groups,
            group_size: params.group_size,
            on_group_key,
            single_server,
        })
    }

    pub fn groups(&self) -> f64 {
        self.groups
    }

    fn reduce_is_local(&self) -> bool {
        self.on_group_key || self.single_server
    }

    fn output_slices(&self) -> (Vec<Slice>, Partitioning) {
        let home = self
            .input
            .occupied()
            .next()
            .or_else(|| self.input.slices.first())
            .map(|s| s.server);
        if self.input.slices.is_empty() {
            return (Vec::new(), Partitioning::Unplaced);
        }
        if self.on_group_key {
            return (
                spread_like(&self.input.slices, self.groups, self.group_size),
                self.input.partitioning.clone(),
            );
        }
        match home {
            Some(home) if self.single_server || self.group_by.is_empty() => (
                vec![Slice {
                    server: home,
                    documents: self.groups,
                    bytes: self.groups * self.group_size,
                }],
                Partitioning::Unsharded { home },
            ),
            _ => {
                let n = self.input.slices.len().max(1) as f64;
                let slices = self
                    .input
                    .slices
                    .iter()
                    .map(|s| Slice {
                        server: s.server,
                        documents: self.groups / n,
                        bytes: self.groups / n * self.group_size,
                    })
                    .collect();
                (
                    slices,
                    Partitioning::Sharded {
                        key: self.group_by.clone(),
                        policy: ShardingPolicy::Hash,
                    },
                )
            }
        }
    }
}

/// Product of the group-by fields' distinct counts capped at the input size,
/// else a fixed share of the input. No group-by: one group.
fn estimate_groups(input: &Dataset, group_by: &[String]) -> f64 {
    let documents = input.documents();
    if group_by.is_empty() {
        return documents.min(1.0);
    }
    match input.distinct_product(group_by) {
        Some(d) => d.min(documents),
        None => FALLBACK_GROUP_RATIO * documents,
    }
}

impl CostModel for AggregateCost<'_> {
    fn name(&self) -> &'static str {
        "aggregate"
    }

    fn algorithm(&self) -> Algorithm {
        if self.on_group_key {
            Algorithm::ShardLocalAggregate
        } else if self.single_server {
            Algorithm::LocalAggregate
        } else {
            Algorithm::MapReduceAggregate
        }
    }

    fn estimate_io(&self) -> IoProfile {
        IoProfile {
            reads: self
                .input
                .slices
                .iter()
                .map(|s| ServerRead {
                    server: s.server,
                    bytes: s.bytes,
                })
                .collect(),
        }
    }

    fn estimate_network(&self) -> NetworkProfile {
        if self.reduce_is_local() {
            NetworkProfile::none()
        } else {
            NetworkProfile {
                bytes: self.groups * self.group_size,
                transfer: Transfer::Reduce {
                    groups: self.groups,
                },
            }
        }
    }

    /// One document per group, partitioned on the group-by fields.
    fn output(&self) -> Dataset {
        let (slices, partitioning) = self.output_slices();
        let distinct = self
            .group_by
            .iter()
            .map(|f| {
                let d = self.input.distinct_of(f).unwrap_or(self.groups);
                (f.clone(), d.min(self.groups))
            })
            .collect();
        Dataset {
            name: format!("aggregate({})", self.input.name),
            document_size: self.group_size,
            fields: self.group_by.clone(),
            distinct,
            indexes: Vec::new(),
            slices,
            partitioning,
        }
    }
}

/// Full estimate for an aggregate over a placed collection.
pub fn estimate_aggregate(
    input: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &AggregateParams,
    config: &CostConfig,
) -> Result<OperatorEstimate> {
    let dataset = input.dataset(cluster)?;
    AggregateCost::new(&dataset, params)?.simulate(config)
}

pub fn simulate_aggregate(
    input: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &AggregateParams,
    config: &CostConfig,
) -> Result<CostResult> {
    Ok(estimate_aggregate(input, cluster, params, config)?.cost)
}
