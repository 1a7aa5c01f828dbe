//! Where every collection of a database lives on a cluster.

use std::collections::BTreeMap;

use docsim_cluster::{Cluster, Distributor, ShardingPlan};
use docsim_core::schema::{Collection, Database};
use docsim_operators::{Dataset, PlacedCollection};
use tracing::debug;

use crate::error::{PlanError, Result};

/// A database placed on a cluster.
///
/// With `sharded` set, every collection with a shard key assigned on the
/// cluster is distributed on it; all other collections (and every
/// collection when `sharded` is off) sit whole on the first server.
#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    database: &'a Database,
    cluster: &'a Cluster,
    plans: BTreeMap<String, ShardingPlan>,
    sharded: bool,
}

impl<'a> Catalog<'a> {
    pub fn new(database: &'a Database, cluster: &'a Cluster, sharded: bool) -> Result<Self> {
        let distributor = Distributor::new(cluster);
        let mut plans = BTreeMap::new();
        for coll in database.collections() {
            let plan = match cluster.shard_key(&coll.name).filter(|_| sharded) {
                Some(key) => distributor.plan(coll, key)?,
                None => distributor.unsharded(coll)?,
            };
            debug!(
                collection = %coll.name,
                sharded = plan.is_sharded(),
                servers = plan.occupied().count(),
                "placed collection"
            );
            plans.insert(coll.name.clone(), plan);
        }
        Ok(Self {
            database,
            cluster,
            plans,
            sharded,
        })
    }

    pub fn database(&self) -> &'a Database {
        self.database
    }

    pub fn cluster(&self) -> &'a Cluster {
        self.cluster
    }

    pub fn is_sharded(&self) -> bool {
        self.sharded
    }

    pub fn plan(&self, collection: &str) -> Result<&ShardingPlan> {
        self.plans
            .get(collection)
            .ok_or_else(|| PlanError::UnknownCollection(collection.to_string()))
    }

    pub fn plans(&self) -> impl Iterator<Item = &ShardingPlan> + '_ {
        self.plans.values()
    }

    pub fn collection(&self, name: &str) -> Result<&'a Collection> {
        if !self.plans.contains_key(name) {
            return Err(PlanError::UnknownCollection(name.to_string()));
        }
        Ok(self.database.collection(name)?)
    }

    /// The collection as an operator input.
    pub fn dataset(&self, collection: &str) -> Result<Dataset> {
        let coll = self.collection(collection)?;
        let plan = self.plan(collection)?;
        Ok(PlacedCollection::new(coll, plan).dataset(self.cluster)?)
    }
}
