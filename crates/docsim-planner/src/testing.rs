//! Fixtures shared by the planner tests.

use docsim_cluster::{Cluster, Server};
use docsim_core::id::ServerId;
use docsim_core::schema::{
    CollectionDesc, Database, DatabaseDesc, DocumentTypeDesc, FieldDesc, TypeDesc,
};
use docsim_core::stats::{CollectionStats, FieldStats};

fn ty(name: &str, fields: &[(&str, &str)]) -> DocumentTypeDesc {
    DocumentTypeDesc {
        name: name.to_string(),
        fields: fields
            .iter()
            .map(|(f, tag)| FieldDesc::new(f, TypeDesc::scalar(tag)))
            .collect(),
    }
}

/// Product (164 B, 100k docs), Stock (60 B, 200k docs) and OrderLine
/// (112 B, 4M docs).
pub(crate) fn shop() -> Database {
    let desc = DatabaseDesc {
        name: "shop".into(),
        document_types: vec![
            ty(
                "Product",
                &[("IDP", "integer"), ("name", "string"), ("price", "float"), ("brand", "string")],
            ),
            ty("Stock", &[("IDP", "integer"), ("IDW", "integer"), ("quantity", "integer")]),
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
                name: "Stock".into(),
                document: "Stock".into(),
                stats: CollectionStats::with_count(200_000)
                    .field("IDP", FieldStats::with_distinct(100_000))
                    .field("IDW", FieldStats::with_distinct(200)),
                indexes: vec!["IDP".into()],
            },
            CollectionDesc {
                name: "OrderLine".into(),
                document: "OrderLine".into(),
                stats: CollectionStats::with_count(4_000_000)
                    .field("IDP", FieldStats::with_distinct(100_000))
                    .field("IDC", FieldStats::with_distinct(1_000_000)),
                indexes: vec![],
            },
        ],
    };
    Database::from_desc(&desc).unwrap()
}

pub(crate) fn cluster(servers: usize) -> Cluster {
    Cluster::uniform(servers, &Server::new(ServerId::new(0))).unwrap()
}
