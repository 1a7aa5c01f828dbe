//! Servers, clusters and per-collection shard keys.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use docsim_core::config::SimLimits;
use docsim_core::error::{Error, Result};
use docsim_core::id::ServerId;
use docsim_core::schema::Collection;
use serde::{Deserialize, Serialize};

use crate::distribute::ShardingPolicy;

const MIB: f64 = 1024.0 * 1024.0;

/// One storage node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub id: ServerId,
    pub storage_capacity_bytes: u64,
    pub io_throughput_bytes_per_sec: f64,
    pub network_bandwidth_bytes_per_sec: f64,
}

impl Server {
    /// A server with the default hardware profile: 1 TiB of storage,
    /// 100 MiB/s disk and 10 MiB/s network.
    pub fn new(id: ServerId) -> Self {
        Self {
            id,
            storage_capacity_bytes: 1 << 40,
            io_throughput_bytes_per_sec: 100.0 * MIB,
            network_bandwidth_bytes_per_sec: 10.0 * MIB,
        }
    }
}

/// Ordered, possibly composite shard key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShardKey(Vec<String>);

impl ShardKey {
    /// Unvalidated key. `Cluster::assign_shard_key` is the checked route.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn fields(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when every key field appears in `fields`. A predicate on those
    /// fields can then be routed to the owning shards.
    pub fn covered_by<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        !self.0.is_empty()
            && self
                .0
                .iter()
                .all(|k| fields.iter().any(|f| f.as_ref() == k))
    }

    /// Same set of fields, order ignored.
    pub fn same_fields<S: AsRef<str>>(&self, fields: &[S]) -> bool {
        let mine: BTreeSet<&str> = self.0.iter().map(String::as_str).collect();
        let theirs: BTreeSet<&str> = fields.iter().map(AsRef::as_ref).collect();
        mine == theirs
    }
}

impl fmt::Display for ShardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.0.join(", "))
    }
}

/// The sharding universe: servers in topology order plus the shard key
/// assigned to each collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cluster {
    servers: Vec<Server>,
    shard_keys: BTreeMap<String, ShardKey>,
    policy: ShardingPolicy,
    limits: SimLimits,
}

impl Cluster {
    pub fn new(servers: Vec<Server>) -> Result<Self> {
        Self::with_limits(servers, SimLimits::default())
    }

    /// Rejects duplicate server ids and clusters larger than
    /// `limits.max_servers`. An empty cluster is allowed; distributing over
    /// it is not.
    pub fn with_limits(servers: Vec<Server>, limits: SimLimits) -> Result<Self> {
        check_server_count(servers.len(), &limits)?;
        let mut seen = BTreeSet::new();
        for s in &servers {
            if !seen.insert(s.id) {
                return Err(Error::Distribution(format!(
                    "duplicate server id {} in cluster",
                    s.id
                )));
            }
        }
        Ok(Self {
            servers,
            shard_keys: BTreeMap::new(),
            policy: ShardingPolicy::default(),
            limits,
        })
    }

    /// `count` copies of `template`, numbered 0..count.
    pub fn uniform(count: usize, template: &Server) -> Result<Self> {
        check_server_count(count, &SimLimits::default())?;
        let servers = (0..count)
            .map(|i| Server {
                id: ServerId::new(i as u64),
                ..template.clone()
            })
            .collect();
        Self::new(servers)
    }

    pub fn with_policy(mut self, policy: ShardingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Validate `key_fields` against the collection's flattened paths and
    /// record them as its shard key, replacing any earlier assignment.
    pub fn assign_shard_key(
        &mut self,
        collection: &Collection,
        key_fields: &[&str],
    ) -> Result<ShardKey> {
        if key_fields.is_empty() {
            return Err(Error::ShardKey(format!(
                "collection '{}': shard key needs at least one field",
                collection.name
            )));
        }
        let paths = collection.field_paths();
        let mut fields: Vec<String> = Vec::with_capacity(key_fields.len());
        for f in key_fields {
            if !paths.iter().any(|p| p == f) {
                return Err(Error::ShardKey(format!(
                    "collection '{}' has no field '{f}' to shard on",
                    collection.name
                )));
            }
            if fields.iter().any(|k| k == f) {
                return Err(Error::ShardKey(format!(
                    "collection '{}': field '{f}' repeated in shard key",
                    collection.name
                )));
            }
            fields.push((*f).to_string());
        }
        let key = ShardKey(fields);
        self.shard_keys.insert(collection.name.clone(), key.clone());
        Ok(key)
    }

    pub fn shard_key(&self, collection: &str) -> Option<&ShardKey> {
        self.shard_keys.get(collection)
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn server(&self, id: ServerId) -> Option<&Server> {
        self.servers.iter().find(|s| s.id == id)
    }

    pub fn contains(&self, id: ServerId) -> bool {
        self.server(id).is_some()
    }

    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Storage capacity per server, in topology order.
    pub fn capacities(&self) -> Vec<(ServerId, u64)> {
        self.servers
            .iter()
            .map(|s| (s.id, s.storage_capacity_bytes))
            .collect()
    }

    pub fn total_capacity_bytes(&self) -> u64 {
        self.servers
            .iter()
            .fold(0u64, |acc, s| acc.saturating_add(s.storage_capacity_bytes))
    }

    pub fn policy(&self) -> ShardingPolicy {
        self.policy
    }

    pub fn limits(&self) -> &SimLimits {
        &self.limits
    }
}

/// Size guard for a cluster of `count` servers; run before building one.
pub fn check_server_count(count: usize, limits: &SimLimits) -> Result<()> {
    if count > limits.max_servers {
        return Err(Error::Config(format!(
            "cluster of {count} servers exceeds the limit of {}",
            limits.max_servers
        )));
    }
    Ok(())
}
