//! Shared fixtures: the DB1 / DB5 designs of the e-commerce case study.

#![allow(dead_code)]

use docsim_cluster::{Cluster, Server};
use docsim_core::id::ServerId;
use docsim_core::schema::{
    CollectionDesc, Database, DatabaseDesc, DocumentTypeDesc, FieldDesc, TypeDesc,
};
use docsim_core::stats::{CollectionStats, FieldStats};

/// Server count used throughout the case study.
pub const SERVERS: usize = 1000;

pub fn scalar(name: &str, tag: &str) -> FieldDesc {
    FieldDesc::new(name, TypeDesc::scalar(tag))
}

pub fn doc(name: &str, fields: Vec<FieldDesc>) -> DocumentTypeDesc {
    DocumentTypeDesc {
        name: name.to_string(),
        fields,
    }
}

fn product_type() -> DocumentTypeDesc {
    doc(
        "Product",
        vec![
            scalar("IDP", "integer"),
            scalar("name", "string"),
            scalar("price", "number"),
            scalar("brand", "string"),
            scalar("description", "longstring"),
        ],
    )
}

fn shared_types() -> Vec<DocumentTypeDesc> {
    vec![
        doc(
            "Stock",
            vec![scalar("IDP", "integer"), scalar("IDW", "integer"), scalar("quantity", "integer")],
        ),
        doc(
            "Warehouse",
            vec![
                scalar("IDW", "integer"),
                scalar("location", "string"),
                scalar("capacity", "integer"),
            ],
        ),
        doc(
            "Client",
            vec![
                scalar("IDC", "integer"),
                scalar("name", "string"),
                scalar("address", "string"),
                scalar("email", "string"),
                scalar("birthDate", "date"),
            ],
        ),
    ]
}

fn shared_collections() -> Vec<CollectionDesc> {
    vec![
        CollectionDesc {
            name: "Stock".into(),
            document: "Stock".into(),
            stats: CollectionStats::with_count(21_000)
                .field("IDP", FieldStats::with_distinct(100_000))
                .field("IDW", FieldStats::with_distinct(200)),
            indexes: vec!["IDW".into()],
        },
        CollectionDesc {
            name: "Warehouse".into(),
            document: "Warehouse".into(),
            stats: CollectionStats::with_count(200).field("IDW", FieldStats::with_distinct(200)),
            indexes: vec!["IDW".into()],
        },
        CollectionDesc {
            name: "Client".into(),
            document: "Client".into(),
            stats: CollectionStats::with_count(10_000_000)
                .field("IDC", FieldStats::with_distinct(10_000_000)),
            indexes: vec!["IDC".into()],
        },
    ]
}

fn product_stats() -> CollectionStats {
    CollectionStats::with_count(100_000)
        .field("IDP", FieldStats::with_distinct(100_000))
        .field(
            "brand",
            FieldStats {
                avg_length: Some(20.0),
                distinct_values: Some(5_000),
                ..FieldStats::default()
            },
        )
}

/// One collection per entity, OrderLine referencing Product and Client.
pub fn db1_desc() -> DatabaseDesc {
    let mut document_types = vec![
        product_type(),
        doc(
            "OrderLine",
            vec![
                scalar("IDP", "integer"),
                scalar("IDC", "integer"),
                scalar("date", "date"),
                scalar("deliveryDate", "date"),
                scalar("quantity", "integer"),
                scalar("comment", "string"),
            ],
        ),
    ];
    document_types.extend(shared_types());

    let mut collections = vec![
        CollectionDesc {
            name: "Product".into(),
            document: "Product".into(),
            stats: product_stats(),
            indexes: vec!["IDP".into()],
        },
        CollectionDesc {
            name: "OrderLine".into(),
            document: "OrderLine".into(),
            stats: CollectionStats::with_count(4_000_000_000)
                .field("IDP", FieldStats::with_distinct(100_000))
                .field("IDC", FieldStats::with_distinct(10_000_000)),
            indexes: vec![],
        },
    ];
    collections.extend(shared_collections());

    DatabaseDesc {
        name: "DB1".into(),
        document_types,
        collections,
    }
}

/// Product embeds its categories and every order line; no OrderLine
/// collection.
pub fn db5_desc() -> DatabaseDesc {
    let mut document_types = vec![
        doc(
            "Product",
            vec![
                scalar("IDP", "integer"),
                scalar("name", "string"),
                scalar("price", "number"),
                scalar("brand", "string"),
                scalar("description", "longstring"),
                FieldDesc::new("categories", TypeDesc::array(TypeDesc::scalar("string"), None)),
                FieldDesc::new(
                    "orderlines",
                    TypeDesc::array(TypeDesc::nested("EmbeddedLine"), None),
                ),
            ],
        ),
        doc(
            "EmbeddedLine",
            vec![
                scalar("IDC", "integer"),
                scalar("date", "date"),
                scalar("deliveryDate", "date"),
                scalar("quantity", "integer"),
                scalar("comment", "string"),
            ],
        ),
    ];
    document_types.extend(shared_types());

    let mut collections = vec![CollectionDesc {
        name: "Product".into(),
        document: "Product".into(),
        stats: product_stats()
            .field("categories", FieldStats::with_cardinality(2.0))
            .field("orderlines", FieldStats::with_cardinality(40_000.0)),
        indexes: vec!["IDP".into()],
    }];
    collections.extend(shared_collections());

    DatabaseDesc {
        name: "DB5".into(),
        document_types,
        collections,
    }
}

pub fn db1() -> Database {
    Database::from_desc(&db1_desc()).unwrap()
}

pub fn db5() -> Database {
    Database::from_desc(&db5_desc()).unwrap()
}

pub fn cluster(servers: usize) -> Cluster {
    Cluster::uniform(servers, &Server::new(ServerId::new(0))).unwrap()
}

/// `servers` identical servers with `keys` assigned as (collection, fields).
pub fn keyed(db: &Database, servers: usize, keys: &[(&str, &[&str])]) -> Cluster {
    let mut c = cluster(servers);
    for (coll, fields) in keys {
        c.assign_shard_key(db.collection(coll).unwrap(), fields).unwrap();
    }
    c
}
