//! The e-commerce case study queries (Q1..Q7 and the warehouse challenge)
//! costed against DB1 / DB5 on a 1000-server cluster.

mod common;

use common::{db1, db5, keyed, SERVERS};
use docsim_core::config::CostConfig;
use docsim_operators::{AggregateParams, Algorithm, CostResult, FilterParams, JoinParams, Transfer};
use docsim_planner::{estimate_query, Catalog, QueryPlan};
use docsim_size::{collection_size, document_size};

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn q1_filter_stock_on_sharded_indexed_warehouse_id() {
    let db = db1();
    let c = keyed(&db, SERVERS, &[("Stock", &["IDW"])]);
    let catalog = Catalog::new(&db, &c, true).unwrap();
    let cfg = CostConfig::default();

    let q = QueryPlan::scan("Stock").filter(FilterParams::new("IDW", 0.0001).with_index(true));
    let est = estimate_query(&q, &catalog, &cfg).unwrap();
    let step = &est.steps[0];

    assert_eq!(step.algorithm.label(), "Shard / Index");
    // 200 warehouse ids: one of them is wanted, on one server
    assert_eq!(step.io.servers_contacted(), 1);
    let stock = db.collection("Stock").unwrap();
    assert!(close(step.io.total_bytes(), 0.0001 * collection_size(stock).unwrap()));
    assert_eq!(step.network.bytes, 0.0);
    assert!(close(est.total.time_seconds, step.io.total_bytes() * cfg.disk_latency_per_byte));
}

#[test]
fn q2_filter_product_on_brand_scans_everything() {
    let db = db1();
    let c = keyed(&db, SERVERS, &[("Product", &["IDP"])]);
    let catalog = Catalog::new(&db, &c, true).unwrap();
    let cfg = CostConfig::default();

    let q = QueryPlan::scan("Product").filter(FilterParams::new("brand", 0.02));
    let est = estimate_query(&q, &catalog, &cfg).unwrap();
    let step = &est.steps[0];

    let product = db.collection("Product").unwrap();
    let total = collection_size(product).unwrap();
    assert_eq!(step.algorithm, Algorithm::ShardFullScan);
    assert_eq!(step.io.servers_contacted(), SERVERS);
    assert!(close(step.io.total_bytes(), total));
    // 100 products per server
    assert!(close(step.io.max_bytes(), 100.0 * document_size(product).unwrap()));
    assert_eq!(step.network.transfer, Transfer::Merge);
    assert!(close(step.network.bytes, 0.02 * total));
}

#[test]
fn q3_and_q4_join_product_orderline() {
    let db = db1();
    let c = keyed(&db, SERVERS, &[("Product", &["IDP"]), ("OrderLine", &["IDP"])]);
    let cfg = CostConfig::default();
    let q = QueryPlan::scan("Product").join(QueryPlan::scan("OrderLine"), JoinParams::new("IDP"));

    let product = db.collection("Product").unwrap();
    let lines = db.collection("OrderLine").unwrap();
    let all_bytes = collection_size(product).unwrap() + collection_size(lines).unwrap();

    // Q3: both sharded on IDP, every server joins its own part
    let sharded = estimate_query(&q, &Catalog::new(&db, &c, true).unwrap(), &cfg).unwrap();
    let step = &sharded.steps[0];
    assert_eq!(step.algorithm.label(), "Shard / Nested Loop");
    assert_eq!(step.network.bytes, 0.0);
    assert!(close(step.io.total_bytes(), all_bytes));
    assert_eq!(step.io.servers_contacted(), SERVERS);

    // Q4: same query, nothing sharded: one server reads both collections
    let local = estimate_query(&q, &Catalog::new(&db, &c, false).unwrap(), &cfg).unwrap();
    let step = &local.steps[0];
    assert_eq!(step.algorithm.label(), "Nested Loop");
    assert_eq!(step.network.bytes, 0.0);
    assert_eq!(step.io.servers_contacted(), 1);
    assert!(close(step.cost.time_seconds, all_bytes * cfg.disk_latency_per_byte));

    // same energy, a thousand times faster once spread
    assert!(close(sharded.total.energy_joules, local.total.energy_joules));
    assert!(sharded.total.time_seconds * 500.0 < local.total.time_seconds);
}

#[test]
fn q5_embedding_orderlines_inflates_product_reads() {
    let (d1, d5) = (db1(), db5());
    let cfg = CostConfig::default();
    let q = QueryPlan::scan("Product").filter(FilterParams::new("IDP", 0.0001));

    let c1 = keyed(&d1, SERVERS, &[("Product", &["IDP"])]);
    let c5 = keyed(&d5, SERVERS, &[("Product", &["IDP"])]);
    let e1 = estimate_query(&q, &Catalog::new(&d1, &c1, true).unwrap(), &cfg).unwrap();
    let e5 = estimate_query(&q, &Catalog::new(&d5, &c5, true).unwrap(), &cfg).unwrap();

    assert_eq!(e5.steps[0].algorithm, Algorithm::ShardIndexScan);
    let p5 = d5.collection("Product").unwrap();
    assert!(close(e5.steps[0].io.total_bytes(), 0.0001 * collection_size(p5).unwrap()));

    let p1 = d1.collection("Product").unwrap();
    let ratio = document_size(p5).unwrap() / document_size(p1).unwrap();
    assert!(ratio > 1000.0);
    assert!(close(e5.total.energy_joules / e1.total.energy_joules, ratio));
}

#[test]
fn q6_most_ordered_products_aggregate_then_join() {
    let db = db1();
    // Product on IDP, OrderLine on IDC
    let c = keyed(&db, SERVERS, &[("Product", &["IDP"]), ("OrderLine", &["IDC"])]);
    let catalog = Catalog::new(&db, &c, true).unwrap();
    let cfg = CostConfig::default();

    let q = QueryPlan::scan("OrderLine")
        .aggregate(AggregateParams::new(["IDP"]).with_groups(100_000.0))
        .join(QueryPlan::scan("Product"), JoinParams::new("IDP"));
    let est = estimate_query(&q, &catalog, &cfg).unwrap();

    let (agg, join) = (&est.steps[0], &est.steps[1]);
    assert_eq!(agg.algorithm.label(), "Map/Reduce Aggregate (Shuffle)");
    assert_eq!(agg.network.bytes, 100_000.0 * 100.0);
    // the reduce output lands partitioned on IDP, like Product
    assert_eq!(join.algorithm, Algorithm::ShardNestedLoop);
    assert_eq!(join.network.bytes, 0.0);
    assert_eq!(est.total, agg.cost.combine(&join.cost));
    assert!(close(est.output.documents(), 100_000.0));
}

#[test]
fn q7_customer_orders_filter_aggregate_join() {
    let db = db1();
    let c = keyed(&db, SERVERS, &[("Product", &["IDP"]), ("OrderLine", &["IDC"])]);
    let catalog = Catalog::new(&db, &c, true).unwrap();
    let cfg = CostConfig::default();

    let q = QueryPlan::scan("OrderLine")
        .filter(FilterParams::new("IDC", 1.0 / 10_000_000.0).with_index(false))
        .aggregate(AggregateParams::new(["IDP"]).with_groups(400.0))
        .join(QueryPlan::scan("Product"), JoinParams::new("IDP"));
    let est = estimate_query(&q, &catalog, &cfg).unwrap();
    assert_eq!(est.steps.len(), 3);

    let (filter, agg, join) = (&est.steps[0], &est.steps[1], &est.steps[2]);
    assert_eq!(filter.algorithm, Algorithm::ShardFullScan);
    assert!((1..=2).contains(&filter.io.servers_contacted()));

    // the client's lines sit on one server after the filter
    assert_eq!(agg.algorithm, Algorithm::LocalAggregate);
    assert_eq!(agg.network.bytes, 0.0);

    assert_eq!(join.algorithm, Algorithm::ShuffleNestedLoop);
    assert_eq!(join.network.bytes, 400.0 * 100.0);
    assert!(matches!(
        join.network.transfer,
        Transfer::Shuffle { ref moved } if moved.starts_with("aggregate(")
    ));

    let summed: CostResult = est.steps.iter().map(|s| s.cost).sum();
    assert_eq!(est.total, summed);
}

#[test]
fn warehouse_challenge_moves_the_filtered_warehouse() {
    let db = db1();
    let c = keyed(&db, SERVERS, &[("Warehouse", &["IDW"]), ("Stock", &["IDP"])]);
    let catalog = Catalog::new(&db, &c, true).unwrap();

    let q = QueryPlan::scan("Warehouse")
        .filter(FilterParams::new("IDW", 1.0 / 200.0))
        .join(QueryPlan::scan("Stock"), JoinParams::new("IDW"));
    let est = estimate_query(&q, &catalog, &CostConfig::default()).unwrap();

    let (filter, join) = (&est.steps[0], &est.steps[1]);
    assert_eq!(filter.algorithm, Algorithm::ShardIndexScan);
    assert_eq!(join.algorithm.label(), "Map/Reduce & Nested Loop");
    assert!(close(join.network.bytes, filter.output.bytes()));
}
