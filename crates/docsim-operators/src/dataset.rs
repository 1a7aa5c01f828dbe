//! Operator inputs and outputs.
//!
//! A `Dataset` is either a collection as placed by a `ShardingPlan` or the
//! result of an earlier operator. Document counts are `f64` because
//! selectivities produce expected, not whole, counts.

use std::collections::{BTreeMap, BTreeSet};

use docsim_cluster::{Cluster, ShardingPlan, ShardingPolicy};
use docsim_core::error::{Error, Result};
use docsim_core::id::ServerId;
use docsim_core::schema::Collection;
use serde::{Deserialize, Serialize};

/// Part of a dataset stored on one server.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    pub server: ServerId,
    pub documents: f64,
    pub bytes: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Partitioning {
    Unsharded { home: ServerId },
    /// Nowhere: the cluster has no server.
    Unplaced,
    Sharded { key: Vec<String>, policy: ShardingPolicy },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    pub document_size: f64,
    /// Flattened field paths available to predicates, keys and group-bys.
    pub fields: Vec<String>,
    /// Distinct values per field path, where known.
    pub distinct: BTreeMap<String, f64>,
    pub indexes: Vec<String>,
    /// In topology order; empty only when `Unplaced`.
    pub slices: Vec<Slice>,
    pub partitioning: Partitioning,
}

/// A collection together with the plan that places it.
#[derive(Debug, Clone, Copy)]
pub struct PlacedCollection<'a> {
    pub collection: &'a Collection,
    pub plan: &'a ShardingPlan,
}

impl<'a> PlacedCollection<'a> {
    pub fn new(collection: &'a Collection, plan: &'a ShardingPlan) -> Self {
        Self { collection, plan }
    }

    /// Dataset view, after checking every planned server is in `cluster`.
    pub fn dataset(&self, cluster: &Cluster) -> Result<Dataset> {
        for server in self.plan.servers() {
            if !cluster.contains(server) {
                return Err(Error::Distribution(format!(
                    "plan for '{}' places data on {server}, which is not in the cluster",
                    self.plan.collection
                )));
            }
        }
        Dataset::from_plan(self.collection, self.plan)
    }
}

impl Dataset {
    pub fn from_plan(collection: &Collection, plan: &ShardingPlan) -> Result<Self> {
        if plan.collection != collection.name {
            return Err(Error::Distribution(format!(
                "plan for '{}' used with collection '{}'",
                plan.collection, collection.name
            )));
        }
        let partitioning = match (&plan.shard_key, plan.shards.first()) {
            (Some(_), None) => {
                return Err(Error::Distribution(format!(
                    "sharded plan for '{}' has no servers",
                    plan.collection
                )));
            }
            (Some(key), Some(_)) => Partitioning::Sharded {
                key: key.fields().to_vec(),
                policy: plan.policy,
            },
            (None, Some(first)) => Partitioning::Unsharded { home: first.server },
            (None, None) => Partitioning::Unplaced,
        };
        let distinct = collection
            .stats
            .fields
            .iter()
            .filter_map(|(path, st)| st.distinct_values.map(|d| (path.clone(), d as f64)))
            .collect();
        Ok(Self {
            name: collection.name.clone(),
            document_size: plan.document_size,
            fields: collection.field_paths(),
            distinct,
            indexes: collection.indexes().to_vec(),
            slices: plan
                .shards
                .iter()
                .map(|s| Slice {
                    server: s.server,
                    documents: s.documents as f64,
                    bytes: s.bytes,
                })
                .collect(),
            partitioning,
        })
    }

    pub fn documents(&self) -> f64 {
        self.slices.iter().map(|s| s.documents).sum()
    }

    pub fn bytes(&self) -> f64 {
        self.slices.iter().map(|s| s.bytes).sum()
    }

    pub fn has_field(&self, path: &str) -> bool {
        self.fields.iter().any(|f| f == path)
    }

    pub fn has_index(&self, path: &str) -> bool {
        self.indexes.iter().any(|i| i == path)
    }

    pub fn distinct_of(&self, path: &str) -> Option<f64> {
        self.distinct.get(path).copied()
    }

    pub fn is_sharded(&self) -> bool {
        matches!(self.partitioning, Partitioning::Sharded { .. })
    }

    pub fn shard_key(&self) -> Option<&[String]> {
        match &self.partitioning {
            Partitioning::Sharded { key, .. } => Some(key),
            Partitioning::Unsharded { .. } | Partitioning::Unplaced => None,
        }
    }

    /// Sharded on exactly `fields` (order ignored).
    pub fn partitioned_on<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        let Some(key) = self.shard_key() else {
            return false;
        };
        let key: BTreeSet<&str> = key.iter().map(String::as_str).collect();
        let fields: BTreeSet<&str> = fields.iter().map(AsRef::as_ref).collect();
        key == fields
    }

    /// Product of the distinct counts of `fields`, if all are known.
    pub fn distinct_product<S: AsRef<str>>(&self, fields: &[S]) -> Option<f64> {
        fields
            .iter()
            .try_fold(1.0, |acc, f| self.distinct_of(f.as_ref()).map(|d| acc * d))
    }

    pub fn servers(&self) -> BTreeSet<ServerId> {
        self.slices.iter().map(|s| s.server).collect()
    }

    /// Slices holding at least some data.
    pub fn occupied(&self) -> impl Iterator<Item = &Slice> + '_ {
        self.slices.iter().filter(|s| s.documents > 0.0)
    }

    pub fn slice_on(&self, server: ServerId) -> Option<&Slice> {
        self.slices.iter().find(|s| s.server == server)
    }

    /// Everything on one server.
    pub(crate) fn gathered(
        name: String,
        template: &Dataset,
        home: ServerId,
        documents: f64,
        document_size: f64,
    ) -> Self {
        Self {
            name,
            document_size,
            fields: template.fields.clone(),
            distinct: cap_distinct(&template.distinct, documents),
            indexes: Vec::new(),
            slices: vec![Slice {
                server: home,
                documents,
                bytes: documents * document_size,
            }],
            partitioning: Partitioning::Unsharded { home },
        }
    }
}

/// Spread `documents` over the servers of `layout` in proportion to the
/// documents each already holds; evenly when `layout` is empty of data.
pub(crate) fn spread_like(layout: &[Slice], documents: f64, document_size: f64) -> Vec<Slice> {
    let held: f64 = layout.iter().map(|s| s.documents).sum();
    let n = layout.len().max(1) as f64;
    layout
        .iter()
        .map(|s| {
            let share = if held > 0.0 { s.documents / held } else { 1.0 / n };
            let docs = documents * share;
            Slice {
                server: s.server,
                documents: docs,
                bytes: docs * document_size,
            }
        })
        .collect()
}

/// Distinct counts cannot exceed the number of documents left.
pub(crate) fn cap_distinct(
    distinct: &BTreeMap<String, f64>,
    documents: f64,
) -> BTreeMap<String, f64> {
    distinct
        .iter()
        .map(|(k, d)| (k.clone(), d.min(documents)))
        .collect()
}
