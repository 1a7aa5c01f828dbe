//! Fixtures shared by the operator tests.

use std::sync::Arc;

use docsim_cluster::{distribute, unsharded, Cluster, Server, ShardingPlan};
use docsim_core::id::ServerId;
use docsim_core::schema::{Collection, DocumentTypeDesc, FieldDesc, SchemaBuilder, TypeDesc};
use docsim_core::stats::{CollectionStats, FieldStats};

/// Integer fields `keys` plus a string `payload` sized so one document is
/// `doc_size` bytes.
pub(crate) fn padded(
    name: &str,
    keys: &[&str],
    count: u64,
    doc_size: f64,
    distinct: &[(&str, u64)],
) -> Collection {
    let mut fields: Vec<FieldDesc> = keys
        .iter()
        .map(|k| FieldDesc::new(k, TypeDesc::scalar("integer")))
        .collect();
    fields.push(FieldDesc::new("payload", TypeDesc::scalar("string")));
    let desc = DocumentTypeDesc {
        name: name.to_string(),
        fields,
    };
    let types = Arc::new(SchemaBuilder::build(&[desc]).unwrap());

    let payload = doc_size - 20.0 * keys.len() as f64 - 12.0;
    let mut stats =
        CollectionStats::with_count(count).field("payload", FieldStats::with_avg_length(payload));
    for (field, d) in distinct {
        stats = stats.field(*field, FieldStats::with_distinct(*d));
    }
    Collection::new(name, types, name, stats).unwrap()
}

pub(crate) fn cluster(servers: usize) -> Cluster {
    Cluster::uniform(servers, &Server::new(ServerId::new(0))).unwrap()
}

/// Shard `coll` on `key`, or leave it on the first server.
pub(crate) fn place(
    coll: &Collection,
    cluster: &mut Cluster,
    key: Option<&[&str]>,
) -> ShardingPlan {
    match key {
        Some(fields) => {
            let key = cluster.assign_shard_key(coll, fields).unwrap();
            distribute(coll, &key, cluster).unwrap()
        }
        None => unsharded(coll, cluster).unwrap(),
    }
}
