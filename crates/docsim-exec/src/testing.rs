//! Fixtures shared by the exec tests.

use std::collections::BTreeMap;

use docsim_cluster::ShardingPolicy;
use docsim_core::schema::{CollectionDesc, DatabaseDesc, DocumentTypeDesc, FieldDesc, TypeDesc};
use docsim_core::stats::{CollectionStats, FieldStats};
use docsim_operators::{AggregateParams, FilterParams, JoinParams};
use docsim_planner::{NamedQuery, QueryPlan};

use crate::scenario::{ClusterDesc, ScenarioDesc};

fn ty(name: &str, fields: &[(&str, &str)]) -> DocumentTypeDesc {
    DocumentTypeDesc {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(f, tag)| FieldDesc::new(f, TypeDesc::scalar(tag)))
            .collect(),
    }
}

/// Product (164 B x 100k) and OrderLine (112 B x 4M), both keyed on IDP,
/// with a brand filter (Q1) and an aggregate-then-join (Q6).
pub(crate) fn shop_desc(servers: usize, sharded: bool) -> ScenarioDesc {
    let database = DatabaseDesc {
        name: "shop".into(),
        document_types: vec![
            ty(
                "Product",
                &[("IDP", "integer"), ("name", "string"), ("price", "float"), ("brand", "string")],
            ),
            ty(
                "OrderLine",
                &[
                    ("IDP", "integer"),
                    ("IDC", "integer"),
                    ("date", "date"),
                    ("quantity", "integer"),
                    ("price", "float"),
                ],
            ),
        ],
        collections: vec![
            CollectionDesc {
                name: "Product".into(),
                document: "Product".into(),
                stats: CollectionStats::with_count(100_000)
                    .field("IDP", FieldStats::with_distinct(100_000))
                    .field("brand", FieldStats::with_avg_length(20.0)),
                indexes: vec!["IDP".into()],
            },
            CollectionDesc {
                name: "OrderLine".into(),
                document: "OrderLine".into(),
                stats: CollectionStats::with_count(4_000_000)
                    .field("IDP", FieldStats::with_distinct(100_000)),
                indexes: vec![],
            },
        ],
    };

    let shard_keys: BTreeMap<String, Vec<String>> = [
        ("Product".to_string(), vec!["IDP".to_string()]),
        ("OrderLine".to_string(), vec!["IDP".to_string()]),
    ]
    .into_iter()
    .collect();

    ScenarioDesc {
        name: "shop".into(),
        database,
        cluster: ClusterDesc {
            servers,
            server: None,
            policy: ShardingPolicy::Hash,
            shard_keys,
        },
        sharded,
        queries: vec![
            NamedQuery {
                name: "Q1".into(),
                plan: QueryPlan::scan("Product").filter(FilterParams::new("brand", 0.02)),
            },
            NamedQuery {
                name: "Q6".into(),
                plan: QueryPlan::scan("OrderLine")
                    .aggregate(AggregateParams::new(["IDP"]))
                    .join(QueryPlan::scan("Product"), JoinParams::new("IDP")),
            },
        ],
    }
}
