//! Join cost model.
//!
//! Co-located when both inputs are sharded on exactly the join key with the
//! same policy over the same servers, or both sit unsharded on the same
//! server: each server joins its local data and nothing moves. Otherwise the
//! smaller input is repartitioned to the larger one's layout. Either way both
//! inputs are read in full.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use docsim_cluster::Cluster;
use docsim_core::config::CostConfig;
use docsim_core::error::{Error, Result};
use docsim_core::id::ServerId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cost::CostResult;
use crate::dataset::{cap_distinct, spread_like, Dataset, Partitioning, PlacedCollection};
use crate::plan::{Algorithm, IoProfile, NetworkProfile, OperatorEstimate, ServerRead, Transfer};
use crate::traits::CostModel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinParams {
    pub key: String,
    #[serde(default)]
    pub is_sharded: bool,
}

impl JoinParams {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            is_sharded: false,
        }
    }

    pub fn sharded(mut self, is_sharded: bool) -> Self {
        self.is_sharded = is_sharded;
        self
    }
}

#[derive(Debug, Clone)]
pub struct JoinCost<'a> {
    left: &'a Dataset,
    right: &'a Dataset,
    key: String,
    co_located: bool,
    sharded: bool,
    /// The larger input; the other one moves when not co-located.
    stays: &'a Dataset,
    moves: &'a Dataset,
}

impl<'a> JoinCost<'a> {
    pub fn new(left: &'a Dataset, right: &'a Dataset, params: &JoinParams) -> Result<Self> {
        for side in [left, right] {
            if !side.has_field(&params.key) {
                return Err(Error::JoinKey(format!(
                    "join key '{}' is not a field of '{}'",
                    params.key, side.name
                )));
            }
        }

        let key = [params.key.as_str()];
        let sharded = params.is_sharded && left.is_sharded() && right.is_sharded();
        let co_located = match (&left.partitioning, &right.partitioning) {
            (
                Partitioning::Sharded { policy: lp, .. },
                Partitioning::Sharded { policy: rp, .. },
            ) => {
                sharded
                    && lp == rp
                    && left.partitioned_on(&key)
                    && right.partitioned_on(&key)
                    && left.servers() == right.servers()
            }
            (Partitioning::Unsharded { home: lh }, Partitioning::Unsharded { home: rh }) => {
                lh == rh
            }
            (Partitioning::Unplaced, Partitioning::Unplaced) => true,
            _ => false,
        };

        // Smaller input moves; equal sizes fall back to name order so the
        // choice does not depend on argument order.
        let (stays, moves) = match left
            .bytes()
            .total_cmp(&right.bytes())
            .then_with(|| left.name.cmp(&right.name))
        {
            Ordering::Greater => (left, right),
            Ordering::Less | Ordering::Equal => (right, left),
        };

        if co_located {
            debug!(left = %left.name, right = %right.name, key = %params.key, "co-located join");
        } else {
            debug!(
                left = %left.name,
                right = %right.name,
                key = %params.key,
                moved = %moves.name,
                moved_bytes = moves.bytes(),
                "shuffle join"
            );
        }

        Ok(Self {
            left,
            right,
            key: params.key.clone(),
            co_located,
            sharded,
            stays,
            moves,
        })
    }

    pub fn is_co_located(&self) -> bool {
        self.co_located
    }

    /// Name of the input that crosses the network, if any.
    pub fn moved(&self) -> Option<&str> {
        (!self.co_located).then_some(self.moves.name.as_str())
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl CostModel for JoinCost<'_> {
    fn name(&self) -> &'static str {
        "join"
    }

    fn algorithm(&self) -> Algorithm {
        match (self.co_located, self.sharded) {
            (true, true) => Algorithm::ShardNestedLoop,
            (true, false) => Algorithm::NestedLoop,
            (false, _) => Algorithm::ShuffleNestedLoop,
        }
    }

    /// Both inputs read in full where they are stored.
    fn estimate_io(&self) -> IoProfile {
        let mut per_server: BTreeMap<ServerId, f64> = BTreeMap::new();
        for slice in self.left.slices.iter().chain(&self.right.slices) {
            *per_server.entry(slice.server).or_insert(0.0) += slice.bytes;
        }
        IoProfile {
            reads: per_server
                .into_iter()
                .map(|(server, bytes)| ServerRead { server, bytes })
                .collect(),
        }
    }

    fn estimate_network(&self) -> NetworkProfile {
        if self.co_located {
            NetworkProfile::none()
        } else {
            NetworkProfile {
                bytes: self.moves.bytes(),
                transfer: Transfer::Shuffle {
                    moved: self.moves.name.clone(),
                },
            }
        }
    }

    /// One output document per document of the larger side (foreign-key
    /// join), carrying both sides' fields, laid out like the larger side.
    fn output(&self) -> Dataset {
        let documents = self.left.documents().max(self.right.documents());
        let document_size = self.left.document_size + self.right.document_size;

        let mut fields = self.left.fields.clone();
        for f in &self.right.fields {
            if !fields.contains(f) {
                fields.push(f.clone());
            }
        }
        let mut distinct = self.left.distinct.clone();
        for (f, d) in &self.right.distinct {
            let e = distinct.entry(f.clone()).or_insert(*d);
            *e = e.max(*d);
        }

        Dataset {
            name: format!("join({},{})", self.left.name, self.right.name),
            document_size,
            fields,
            distinct: cap_distinct(&distinct, documents),
            indexes: Vec::new(),
            slices: spread_like(&self.stays.slices, documents, document_size),
            partitioning: self.stays.partitioning.clone(),
        }
    }
}

/// Full estimate for a join of two placed collections.
pub fn estimate_join(
    left: PlacedCollection<'_>,
    right: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &JoinParams,
    config: &CostConfig,
) -> Result<OperatorEstimate> {
    let left = left.dataset(cluster)?;
    let right = right.dataset(cluster)?;
    JoinCost::new(&left, &right, params)?.simulate(config)
}

pub fn simulate_join(
    left: PlacedCollection<'_>,
    right: PlacedCollection<'_>,
    cluster: &Cluster,
    params: &JoinParams,
    config: &CostConfig,
) -> Result<CostResult> {
    Ok(estimate_join(left, right, cluster, params, config)?.cost)
}
