//! Filter cost model.
//!
//! A predicate that pins the shard key is routed to the shards owning the
//! matching key values; anything else is broadcast to every server. Without
//! an index a contacted server scans its whole shard whatever the
//! selectivity. With one it reads only the matching documents. Results from
//! more than one server are merged on the coordinator.

use docsim_cluster::{Cluster, ShardingPolicy};
use docsim_core::config::CostConfig;
use docsim_core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::CostResult;
use crate::dataset::{Dataset, Partitioning, PlacedCollection, Slice};
use crate::plan::{Algorithm, IoProfile, NetworkProfile, OperatorEstimate, ServerRead, Transfer};
use crate::traits::CostModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Fields the predicate constrains.
    pub fields: Vec<String>,
    /// Fraction of documents that match, in `[0, 1]`.
    pub selectivity: f64,
    /// `None`: use an index when the dataset declares one on a predicate field.
    #[serde(default)]
    pub uses_index: Option<bool>,
    #[serde(default)]
    pub is_sharded: bool,
}

impl FilterParams {
    pub fn new(field: impl Into<String>, selectivity: f64) -> Self {
        Self {
            fields: vec![field.into()],
            selectivity,
            uses_index: None,
            is_sharded: false,
        }
    }

    pub fn with_index(mut self, uses_index: bool) -> Self {
        self.uses_index = Some(uses_index);
        self
    }

    pub fn sharded(mut self, is_sharded: bool) -> Self {
        self.is_sharded = is_sharded;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FilterCost<'a> {
    input: &'a Dataset,
    selectivity: f64,
    uses_index: bool,
    sharded: bool,
    targeted: bool,
    contacted: Vec<Slice>,
}

impl<'a> FilterCost<'a> {
    pub fn new(input: &'a Dataset, params: &FilterParams) -> Result<Self> {
        check_selectivity(&input.name, params.selectivity)?;
        if params.fields.is_empty() {
            return Err(Error::Parameter(format!(
                "filter on '{}' names no field",
                input.name
            )));
        }
        for f in &params.fields {
            if !input.has_field(f) {
                return Err(Error::Schema(format!(
                    "filter on '{}': no field '{f}'",
                    input.name
                )));
            }
        }

        let uses_index = params
            .uses_index
            .unwrap_or_else(|| params.fields.iter().any(|f| input.has_index(f)));
        let sharded = params.is_sharded && input.is_sharded();
        let targeted = sharded
            && input
                .shard_key()
                .map_or(false, |key| key.iter().all(|k| params.fields.contains(k)));

        let contacted = if targeted {
            route(input, params.selectivity)
        } else {
            input.slices.clone()
        };

        debug!(
            dataset = %input.name,
            targeted,
            uses_index,
            contacted = contacted.len(),
            servers = input.slices.len(),
            "filter routing"
        );

        Ok(Self {
            input,
            selectivity: params.selectivity,
            uses_index,
            sharded,
            targeted,
            contacted,
        })
    }

    pub fn is_targeted(&self) -> bool {
        self.targeted
    }

    pub fn uses_index(&self) -> bool {
        self.uses_index
    }

    fn matching_documents(&self) -> f64 {
        self.selectivity * self.input.documents()
    }

    fn responding(&self) -> usize {
        self.contacted.iter().filter(|s| s.documents > 0.0).count()
    }
}

impl CostModel for FilterCost<'_> {
    fn name(&self) -> &'static str {
        "filter"
    }

    fn algorithm(&self) -> Algorithm {
        match (self.sharded, self.uses_index) {
            (true, true) => Algorithm::ShardIndexScan,
            (true, false) => Algorithm::ShardFullScan,
            (false, true) => Algorithm::IndexScan,
            (false, false) => Algorithm::FullScan,
        }
    }

    fn estimate_io(&self) -> IoProfile {
        let matching_bytes = self.selectivity * self.input.bytes();
        let contacted_bytes: f64 = self.contacted.iter().map(|s| s.bytes).sum();
        let reads = self
            .contacted
            .iter()
            .map(|s| {
                let bytes = if !self.uses_index {
                    s.bytes
                } else if self.targeted {
                    // every match lives on the contacted shards
                    if contacted_bytes > 0.0 {
                        (matching_bytes * s.bytes / contacted_bytes).min(s.bytes)
                    } else {
                        0.0
                    }
                } else {
                    self.selectivity * s.bytes
                };
                ServerRead {
                    server: s.server,
                    bytes,
                }
            })
            .collect();
        IoProfile { reads }
    }

    fn estimate_network(&self) -> NetworkProfile {
        if self.responding() > 1 {
            NetworkProfile {
                bytes: self.selectivity * self.input.bytes(),
                transfer: Transfer::Merge,
            }
        } else {
            NetworkProfile::none()
        }
    }

    fn output(&self) -> Dataset {
        let home = self
            .contacted
            .first()
            .or_else(|| self.input.slices.first())
            .map(|s| s.server);
        let documents = self.matching_documents();
        match home {
            Some(home) => Dataset::gathered(
                format!("filter({})", self.input.name),
                self.input,
                home,
                documents,
                self.input.document_size,
            ),
            None => self.input.clone(),
        }
    }
}

/// Shards owning the matching key values: the largest ones, so the
/// bottleneck is never underestimated.
fn route(input: &Dataset, selectivity: f64) -> Vec<Slice> {
    let mut occupied: Vec<Slice> = input.occupied().copied().collect();
    // stable: equal shards keep topology order
    occupied.sort_by(|a, b| b.bytes.total_cmp(&a.bytes));

    let buckets = match &input.partitioning {
        Partitioning::Sharded {
            key,
            policy: ShardingPolicy::Hash,
        } => input
            .distinct_product(key.as_slice())
            .unwrap_or_else(|| input.documents()),
        Partitioning::Sharded {
            policy: ShardingPolicy::Range,
            ..
        } => occupied.len() as f64,
        Partitioning::Unsharded { .. } | Partitioning::Unplaced => 1.0,
    };
    let wanted = (selectivity * buckets).ceil();
    let k = if wanted.is_finite() && wanted >= 1.0 {
        (wanted as usize).min(occupied.len())
    } else {
        1.min(occupied.len())
    };
    occupied.truncate(k);
    occupied
}

fn check_selectivity(dataset: &str, selectivity: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&selectivity) {
        return Err(Error::Parameter(format!(
            "filter on '{dataset}': selectivity {selectivity} outside [0, 1]"
        )));
    }
    Ok(())
}

/// Full estimate for a filter over a placed collection.
pub fn estimate_filter(
    input: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &FilterParams,
    config: &CostConfig,
) -> Result<OperatorEstimate> {
    let dataset = input.dataset(cluster)?;
    FilterCost::new(&dataset, params)?.simulate(config)
}

pub fn simulate_filter(
    input: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &FilterParams,
    config: &CostConfig,
) -> Result<CostResult> {
    Ok(estimate_filter(input, cluster, params, config)?.cost)
}
