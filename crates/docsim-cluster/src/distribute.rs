//! Sharding distributor: collection + shard key + cluster -> `ShardingPlan`.
//!
//! Documents are bucketed by shard-key value. With no key statistics every
//! server gets `n / s` documents, the first `n % s` servers one more. When the
//! key field declares `value_weights`, or fewer distinct values than there are
//! servers, the values are enumerated and routed one by one (hash bucket or
//! contiguous range), and documents follow their value's weight. Counts are
//! apportioned by largest remainder, so they always sum to the collection's
//! document count.

use std::cmp::Ordering;

use docsim_core::error::{Error, Result};
use docsim_core::hash::bucket_of;
use docsim_core::id::ServerId;
use docsim_core::schema::Collection;
use docsim_size::SizeEstimator;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::topology::{Cluster, ShardKey};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardingPolicy {
    /// Key value -> `hash(value) mod servers`.
    #[default]
    Hash,
    /// Sorted key values split into contiguous runs, one run per server.
    Range,
}

/// What one server holds of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerShard {
    pub server: ServerId,
    pub documents: u64,
    pub bytes: f64,
    /// Expected distinct shard-key values stored on this server.
    pub distinct_key_values: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingPlan {
    pub collection: String,
    /// `None` when the collection is not sharded.
    pub shard_key: Option<ShardKey>,
    pub policy: ShardingPolicy,
    pub document_size: f64,
    /// Distinct key values known from statistics.
    pub key_cardinality: Option<u64>,
    /// Sharded: one entry per cluster server in topology order.
    /// Unsharded: the home server only, or nothing on an empty cluster.
    pub shards: Vec<ServerShard>,
}

impl ShardingPlan {
    pub fn is_sharded(&self) -> bool {
        self.shard_key.is_some()
    }

    pub fn total_documents(&self) -> u64 {
        self.shards.iter().map(|s| s.documents).sum()
    }

    pub fn total_bytes(&self) -> f64 {
        self.shards.iter().map(|s| s.bytes).sum()
    }

    /// Bytes on the fullest server.
    pub fn max_shard_bytes(&self) -> f64 {
        self.shards.iter().map(|s| s.bytes).fold(0.0, f64::max)
    }

    pub fn servers(&self) -> impl Iterator<Item = ServerId> + '_ {
        self.shards.iter().map(|s| s.server)
    }

    pub fn shard(&self, server: ServerId) -> Option<&ServerShard> {
        self.shards.iter().find(|s| s.server == server)
    }

    /// Shards that hold at least one document.
    pub fn occupied(&self) -> impl Iterator<Item = &ServerShard> + '_ {
        self.shards.iter().filter(|s| s.documents > 0)
    }
}

/// Plans placements over one cluster. Policy defaults to the cluster's;
/// document sizes come from `estimator`.
#[derive(Debug, Clone, Copy)]
pub struct Distributor<'a> {
    cluster: &'a Cluster,
    policy: ShardingPolicy,
    estimator: SizeEstimator,
}

impl<'a> Distributor<'a> {
    pub fn new(cluster: &'a Cluster) -> Self {
        Self {
            cluster,
            policy: cluster.policy(),
            estimator: SizeEstimator {
                limits: *cluster.limits(),
                ..SizeEstimator::default()
            },
        }
    }

    pub fn with_policy(mut self, policy: ShardingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_estimator(mut self, estimator: SizeEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn plan(&self, collection: &Collection, shard_key: &ShardKey) -> Result<ShardingPlan> {
        let servers = self.cluster.servers();
        if servers.is_empty() {
            return Err(Error::Distribution(format!(
                "collection '{}': cluster has no servers",
                collection.name
            )));
        }
        match self.cluster.shard_key(&collection.name) {
            Some(assigned) if assigned == shard_key => {}
            Some(assigned) => {
                return Err(Error::Distribution(format!(
                    "collection '{}': shard key {shard_key} is not the assigned key {assigned}",
                    collection.name
                )))
            }
            None => {
                return Err(Error::Distribution(format!(
                    "collection '{}': no shard key assigned",
                    collection.name
                )))
            }
        }

        let documents = collection.document_count()?;
        let document_size = self.estimator.document_size(collection)?;
        let s = servers.len();

        let distinct = shard_key.fields().iter().try_fold(1u64, |acc, f| {
            collection
                .stats
                .get(f)
                .and_then(|st| st.distinct_values)
                .map(|d| acc.saturating_mul(d))
        });
        if distinct == Some(0) && documents > 0 {
            return Err(Error::Statistics(format!(
                "collection '{}': shard key {shard_key} declares no distinct values \
                 for {documents} documents",
                collection.name
            )));
        }
        // Declared skew only makes sense for a single-field key.
        let weights = match shard_key.fields() {
            [field] => collection
                .stats
                .get(field)
                .and_then(|st| st.value_weights.as_deref())
                .filter(|w| !w.is_empty()),
            _ => None,
        };

        let (counts, per_server_values, key_cardinality) = match (weights, distinct) {
            (Some(w), _) => {
                let seed = format!("{}/{}", collection.name, shard_key.fields().join(","));
                let (counts, values) = self.enumerate(collection, &seed, documents, w, s)?;
                (counts, values, Some(w.len() as u64))
            }
            (None, Some(d)) if d < s as u64 => {
                let seed = format!("{}/{}", collection.name, shard_key.fields().join(","));
                let uniform = vec![1.0; d as usize];
                let (counts, values) = self.enumerate(collection, &seed, documents, &uniform, s)?;
                (counts, values, Some(d))
            }
            (None, d) => {
                let counts = even_split(documents, s);
                let values = counts
                    .iter()
                    .map(|&c| match d {
                        Some(d) => (d as f64 / s as f64).min(c as f64),
                        // Without statistics the key is taken to be unique.
                        None => c as f64,
                    })
                    .collect();
                (counts, values, d)
            }
        };

        let shards = servers
            .iter()
            .zip(counts)
            .zip(per_server_values)
            .map(|((server, docs), values)| ServerShard {
                server: server.id,
                documents: docs,
                bytes: docs as f64 * document_size,
                distinct_key_values: values,
            })
            .collect();

        let plan = ShardingPlan {
            collection: collection.name.clone(),
            shard_key: Some(shard_key.clone()),
            policy: self.policy,
            document_size,
            key_cardinality,
            shards,
        };
        debug!(
            collection = %collection.name,
            key = %shard_key,
            policy = ?self.policy,
            servers = s,
            max_bytes = plan.max_shard_bytes(),
            "distributed collection"
        );

        #[cfg(debug_assertions)]
        crate::verify::check_plan(&plan, collection)?;

        Ok(plan)
    }

    /// The whole collection on the first server in topology order. An
    /// empty cluster hosts nothing: the plan has no shards and every
    /// operator over it costs zero.
    pub fn unsharded(&self, collection: &Collection) -> Result<ShardingPlan> {
        let documents = collection.document_count()?;
        let document_size = self.estimator.document_size(collection)?;
        let shards = match self.cluster.servers().first() {
            Some(home) => vec![ServerShard {
                server: home.id,
                documents,
                bytes: documents as f64 * document_size,
                distinct_key_values: 0.0,
            }],
            None => {
                debug!(collection = %collection.name, "empty cluster, collection left unplaced");
                Vec::new()
            }
        };
        Ok(ShardingPlan {
            collection: collection.name.clone(),
            shard_key: None,
            policy: self.policy,
            document_size,
            key_cardinality: None,
            shards,
        })
    }

    /// Route every enumerated key value to a server and apportion documents
    /// by the weight each server receives.
    fn enumerate(
        &self,
        collection: &Collection,
        seed: &str,
        documents: u64,
        weights: &[f64],
        servers: usize,
    ) -> Result<(Vec<u64>, Vec<f64>)> {
        let limit = self.cluster.limits().max_enumerated_key_values;
        if weights.len() > limit {
            return Err(Error::Config(format!(
                "collection '{}': {} shard-key values exceed the enumeration limit of {limit}",
                collection.name,
                weights.len()
            )));
        }
        let mut server_weight = vec![0.0; servers];
        let mut server_values = vec![0u64; servers];
        for (i, w) in weights.iter().enumerate() {
            let b = self.route(seed, i, weights.len(), servers);
            server_weight[b] += w;
            server_values[b] += 1;
        }
        let counts = apportion(documents, &server_weight);
        let values = counts
            .iter()
            .zip(&server_values)
            .map(|(&c, &v)| v.min(c) as f64)
            .collect();
        Ok((counts, values))
    }

    fn route(&self, seed: &str, ordinal: usize, values: usize, servers: usize) -> usize {
        match self.policy {
            ShardingPolicy::Hash => bucket_of(seed, ordinal as u64, servers),
            ShardingPolicy::Range => {
                ((ordinal as u128 * servers as u128) / values.max(1) as u128) as usize
            }
        }
    }
}

/// Distribute under the cluster's default policy.
pub fn distribute(
    collection: &Collection,
    shard_key: &ShardKey,
    cluster: &Cluster,
) -> Result<ShardingPlan> {
    Distributor::new(cluster).plan(collection, shard_key)
}

pub fn distribute_with(
    collection: &Collection,
    shard_key: &ShardKey,
    cluster: &Cluster,
    policy: ShardingPolicy,
) -> Result<ShardingPlan> {
    Distributor::new(cluster)
        .with_policy(policy)
        .plan(collection, shard_key)
}

pub fn unsharded(collection: &Collection, cluster: &Cluster) -> Result<ShardingPlan> {
    Distributor::new(cluster).unsharded(collection)
}

/// `total / n` each, the first `total % n` get one extra.
pub(crate) fn even_split(total: u64, n: usize) -> Vec<u64> {
    if n == 0 {
        return Vec::new();
    }
    let base = total / n as u64;
    let rem = total % n as u64;
    (0..n as u64).map(|i| base + u64::from(i < rem)).collect()
}

/// Largest-remainder apportionment of `total` over `weights`.
/// Sums exactly to `total`; ties go to the lower index.
pub(crate) fn apportion(total: u64, weights: &[f64]) -> Vec<u64> {
    let sum: f64 = weights.iter().sum();
    if weights.is_empty() || sum <= 0.0 || !sum.is_finite() {
        return even_split(total, weights.len());
    }

    let quotas: Vec<f64> = weights.iter().map(|w| total as f64 * (w / sum)).collect();
    let mut counts: Vec<u64> = quotas.iter().map(|q| q.floor() as u64).collect();
    let mut assigned: u64 = counts.iter().sum();

    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| {
        let ra = quotas[a] - quotas[a].floor();
        let rb = quotas[b] - quotas[b].floor();
        rb.partial_cmp(&ra).unwrap_or(Ordering::Equal).then(a.cmp(&b))
    });

    let mut k = 0;
    while assigned < total {
        counts[order[k % order.len()]] += 1;
        assigned += 1;
        k += 1;
    }
    // f64 quotas can overshoot by a unit on very large totals.
    k = 0;
    while assigned > total {
        let i = order[order.len() - 1 - (k % order.len())];
        if counts[i] > 0 {
            counts[i] -= 1;
            assigned -= 1;
        }
        k += 1;
    }
    counts
}
