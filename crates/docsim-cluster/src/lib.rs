#![forbid(unsafe_code)]
//! docsim-cluster: where the documents of a collection live.
//!
//! Responsibilities:
//! - Describe servers and the cluster they form (`topology`).
//! - Validate and record one shard key per collection.
//! - Turn a collection + shard key + cluster into a `ShardingPlan`
//!   (`distribute`), under the hash or range policy.
//! - Summarise plans (`stats`) and check their invariants (`verify`).
//!
//! Plans are derived values: recompute them, never patch them.

pub mod distribute;
pub mod stats;
pub mod topology;
pub mod verify;

pub use distribute::{
    distribute, distribute_with, unsharded, Distributor, ServerShard, ShardingPlan,
    ShardingPolicy,
};
pub use stats::ShardingStats;
pub use topology::{check_server_count, Cluster, Server, ShardKey};
