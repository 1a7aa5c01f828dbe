//! Invariant checks for sharding plans.
//!
//! Run on every plan in debug builds and from tests. They should be cheap.

use std::collections::BTreeSet;

use docsim_core::error::{Error, Result};
use docsim_core::schema::Collection;

use crate::distribute::ShardingPlan;

/// Every document on exactly one server: per-server counts sum to the
/// collection's count, each server appears once, and byte volumes are finite,
/// non-negative and equal to `documents x document_size`. An unsharded plan
/// with no shards (empty cluster) holds nothing and passes.
pub fn check_plan(plan: &ShardingPlan, collection: &Collection) -> Result<()> {
    if plan.shards.is_empty() && !plan.is_sharded() {
        return Ok(());
    }
    let expected = collection.document_count()?;
    let placed = plan.total_documents();
    if placed != expected {
        return Err(Error::Invariant(format!(
            "plan for '{}' places {placed} documents, collection has {expected}",
            plan.collection
        )));
    }

    let mut seen = BTreeSet::new();
    for shard in &plan.shards {
        if !seen.insert(shard.server) {
            return Err(Error::Invariant(format!(
                "plan for '{}' lists server {} twice",
                plan.collection, shard.server
            )));
        }
        if !shard.bytes.is_finite() || shard.bytes < 0.0 {
            return Err(Error::Invariant(format!(
                "plan for '{}': server {} holds {} bytes",
                plan.collection, shard.server, shard.bytes
            )));
        }
        let want = shard.documents as f64 * plan.document_size;
        if (shard.bytes - want).abs() > 1e-6 * want.max(1.0) {
            return Err(Error::Invariant(format!(
                "plan for '{}': server {} holds {} bytes for {} documents of {} bytes",
                plan.collection, shard.server, shard.bytes, shard.documents, plan.document_size
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use docsim_core::id::ServerId;
    use docsim_core::schema::{DocumentTypeDesc, FieldDesc, SchemaBuilder, TypeDesc};
    use docsim_core::stats::CollectionStats;

    use super::*;
    use crate::distribute::{distribute, unsharded};
    use crate::topology::{Cluster, Server};

    fn setup() -> (Collection, Cluster) {
        let desc = DocumentTypeDesc {
            name: "Client".into(),
            fields: vec![FieldDesc::new("IDC", TypeDesc::scalar("integer"))],
        };
        let types = Arc::new(SchemaBuilder::build(&[desc]).unwrap());
        let stats = CollectionStats::with_count(9);
        let coll = Collection::new("Client", types, "Client", stats).unwrap();
        let cluster = Cluster::uniform(4, &Server::new(ServerId::new(0))).unwrap();
        (coll, cluster)
    }

    #[test]
    fn distributed_plans_pass() {
        let (coll, mut cluster) = setup();
        let key = cluster.assign_shard_key(&coll, &["IDC"]).unwrap();
        let plan = distribute(&coll, &key, &cluster).unwrap();
        check_plan(&plan, &coll).unwrap();
    }

    #[test]
    fn lost_documents_detected() {
        let (coll, mut cluster) = setup();
        let key = cluster.assign_shard_key(&coll, &["IDC"]).unwrap();
        let mut plan = distribute(&coll, &key, &cluster).unwrap();
        plan.shards[0].documents -= 1;
        plan.shards[0].bytes -= plan.document_size;
        assert!(matches!(check_plan(&plan, &coll), Err(Error::Invariant(_))));
    }

    #[test]
    fn duplicate_server_detected() {
        let (coll, mut cluster) = setup();
        let key = cluster.assign_shard_key(&coll, &["IDC"]).unwrap();
        let mut plan = distribute(&coll, &key, &cluster).unwrap();
        let moved = plan.shards[1].documents;
        plan.shards[1].server = plan.shards[0].server;
        assert!(moved > 0);
        assert!(matches!(check_plan(&plan, &coll), Err(Error::Invariant(_))));
    }

    #[test]
    fn unplaced_collection_passes_only_unsharded() {
        let (coll, mut cluster) = setup();
        let empty = Cluster::new(Vec::new()).unwrap();
        check_plan(&unsharded(&coll, &empty).unwrap(), &coll).unwrap();

        let key = cluster.assign_shard_key(&coll, &["IDC"]).unwrap();
        let mut plan = distribute(&coll, &key, &cluster).unwrap();
        plan.shards.clear();
        assert!(matches!(check_plan(&plan, &coll), Err(Error::Invariant(_))));
    }
}
