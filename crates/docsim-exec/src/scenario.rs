//! Scenario inputs: one database design on one cluster plus its queries.

use std::collections::BTreeMap;

use docsim_cluster::{check_server_count, Cluster, Server, ShardingPolicy};
use docsim_core::config::{CostConfig, SimLimits};
use docsim_core::id::ServerId;
use docsim_core::schema::{Database, DatabaseDesc, DocTypeTable};
use docsim_core::stats::CollectionStats;
use docsim_planner::NamedQuery;
use serde::{Deserialize, Serialize};

use crate::runtime::ExecError;

#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub database: Database,
    /// Shard keys are assigned on the cluster.
    pub cluster: Cluster,
    /// Off: every collection sits whole on the first server.
    pub sharded: bool,
    pub queries: Vec<NamedQuery>,
}

/// Serializable scenario, as read from a file by an external loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDesc {
    pub name: String,
    pub database: DatabaseDesc,
    pub cluster: ClusterDesc,
    #[serde(default)]
    pub sharded: bool,
    #[serde(default)]
    pub queries: Vec<NamedQuery>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDesc {
    /// Number of identical servers.
    pub servers: usize,
    /// Server template; the id is replaced by the position.
    #[serde(default)]
    pub server: Option<Server>,
    #[serde(default)]
    pub policy: ShardingPolicy,
    /// Collection name -> shard key fields.
    #[serde(default)]
    pub shard_keys: BTreeMap<String, Vec<String>>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        database: Database,
        cluster: Cluster,
        sharded: bool,
    ) -> Self {
        Self {
            name: name.into(),
            database,
            cluster,
            sharded,
            queries: Vec::new(),
        }
    }

    pub fn with_queries(mut self, queries: impl IntoIterator<Item = NamedQuery>) -> Self {
        self.queries.extend(queries);
        self
    }

    /// Build and validate a scenario from its descriptor.
    pub fn from_desc(desc: ScenarioDesc, limits: SimLimits) -> Result<Self, ExecError> {
        check_server_count(desc.cluster.servers, &limits)?;
        let database = Database::from_desc(&desc.database)?;

        let template = desc
            .cluster
            .server
            .unwrap_or_else(|| Server::new(ServerId::new(0)));
        let servers = (0..desc.cluster.servers)
            .map(|i| Server {
                id: ServerId::new(i as u64),
                ..template.clone()
            })
            .collect();
        let mut cluster = Cluster::with_limits(servers, limits)?.with_policy(desc.cluster.policy);

        for (coll, fields) in &desc.cluster.shard_keys {
            let collection = database.collection(coll)?;
            let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
            cluster.assign_shard_key(collection, &fields)?;
        }

        Ok(Self {
            name: desc.name,
            database,
            cluster,
            sharded: desc.sharded,
            queries: desc.queries,
        })
    }

    /// Stable view of everything that determines a run's figures.
    pub(crate) fn fingerprint_input<'a>(&'a self, cost: &'a CostConfig) -> FingerprintInput<'a> {
        FingerprintInput {
            name: &self.name,
            types: self.database.types(),
            collections: self
                .database
                .collections()
                .map(|c| CollectionInput {
                    name: &c.name,
                    document: &c.document_type().name,
                    stats: &c.stats,
                    indexes: c.indexes(),
                })
                .collect(),
            cluster: &self.cluster,
            sharded: self.sharded,
            queries: &self.queries,
            cost,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct FingerprintInput<'a> {
    name: &'a str,
    types: &'a DocTypeTable,
    collections: Vec<CollectionInput<'a>>,
    cluster: &'a Cluster,
    sharded: bool,
    queries: &'a [NamedQuery],
    cost: &'a CostConfig,
}

#[derive(Serialize)]
struct CollectionInput<'a> {
    name: &'a str,
    document: &'a str,
    stats: &'a CollectionStats,
    indexes: &'a [String],
}
