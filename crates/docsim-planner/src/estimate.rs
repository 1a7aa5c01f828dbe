//! Bottom-up cost estimation of a query plan.

use docsim_core::config::CostConfig;
use docsim_operators::{
    AggregateCost, CostModel, CostResult, Dataset, FilterCost, JoinCost, OperatorEstimate,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::error::Result;
use crate::plan::QueryPlan;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryEstimate {
    /// One entry per operator, children before parents.
    pub steps: Vec<OperatorEstimate>,
    /// Sum of every step's cost.
    pub total: CostResult,
    /// What the root operator produces.
    pub output: Dataset,
}

/// Estimate every operator of `plan` over the placements in `catalog`.
///
/// The catalog's sharded flag replaces each operator's own `is_sharded`, so
/// one plan can be costed against a sharded and a non-sharded deployment.
pub fn estimate_query(
    plan: &QueryPlan,
    catalog: &Catalog<'_>,
    config: &CostConfig,
) -> Result<QueryEstimate> {
    config.validate()?;
    let mut steps = Vec::with_capacity(plan.operator_count());
    let output = walk(plan, catalog, config, &mut steps)?;
    let total: CostResult = steps.iter().map(|s| s.cost).sum();
    debug!(
        plan = %plan,
        steps = steps.len(),
        time_seconds = total.time_seconds,
        energy_joules = total.energy_joules,
        "estimated query"
    );
    Ok(QueryEstimate { steps, total, output })
}

fn walk(
    plan: &QueryPlan,
    catalog: &Catalog<'_>,
    config: &CostConfig,
    steps: &mut Vec<OperatorEstimate>,
) -> Result<Dataset> {
    let sharded = catalog.is_sharded();
    let est = match plan {
        QueryPlan::Scan { collection } => return catalog.dataset(collection),
        QueryPlan::Filter { input, params } => {
            let input = walk(input, catalog, config, steps)?;
            let params = params.clone().sharded(sharded);
            FilterCost::new(&input, &params)?.simulate(config)?
        }
        QueryPlan::Join { left, right, params } => {
            let left = walk(left, catalog, config, steps)?;
            let right = walk(right, catalog, config, steps)?;
            let params = params.clone().sharded(sharded);
            JoinCost::new(&left, &right, &params)?.simulate(config)?
        }
        QueryPlan::Aggregate { input, params } => {
            let input = walk(input, catalog, config, steps)?;
            let params = params.clone().sharded(sharded);
            AggregateCost::new(&input, &params)?.simulate(config)?
        }
    };
    trace!(
        operator = %est.operator,
        algorithm = %est.algorithm,
        time_seconds = est.cost.time_seconds,
        "operator step"
    );
    let output = est.output.clone();
    steps.push(est);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use docsim_operators::{AggregateParams, Algorithm, FilterParams, JoinParams};

    use super::*;
    use crate::error::PlanError;
    use crate::testing::{cluster, shop};

    fn q6() -> QueryPlan {
        QueryPlan::scan("OrderLine")
            .aggregate(AggregateParams::new(["IDP"]))
            .join(QueryPlan::scan("Product"), JoinParams::new("IDP"))
    }

    #[test]
    fn empty_cluster_costs_nothing() {
        let db = shop();
        let empty = cluster(0);
        let catalog = Catalog::new(&db, &empty, false).unwrap();
        assert!(catalog.plans().all(|p| p.shards.is_empty()));

        let q = QueryPlan::scan("Product")
            .filter(FilterParams::new("brand", 0.02))
            .join(q6(), JoinParams::new("IDP"));
        let est = estimate_query(&q, &catalog, &CostConfig::default()).unwrap();
        assert_eq!(est.steps.len(), 3);
        assert!(est.steps.iter().all(|s| s.cost == CostResult::ZERO && s.network.bytes == 0.0));
        assert_eq!(est.total, CostResult::ZERO);
        assert_eq!(est.output.documents(), 0.0);

        // distributing is still an error
        let mut keyed = cluster(0);
        keyed.assign_shard_key(db.collection("Stock").unwrap(), &["IDP"]).unwrap();
        assert!(matches!(
            Catalog::new(&db, &keyed, true),
            Err(PlanError::Sim(docsim_core::Error::Distribution(_)))
        ));
    }

    #[test]
    fn scan_alone_costs_nothing() {
        let db = shop();
        let c = cluster(2);
        let catalog = Catalog::new(&db, &c, false).unwrap();
        let scan = QueryPlan::scan("Product");
        let est = estimate_query(&scan, &catalog, &CostConfig::default()).unwrap();
        assert!(est.steps.is_empty());
        assert_eq!(est.total, CostResult::ZERO);
        assert_eq!(est.output.documents(), 100_000.0);
        assert_eq!(est.output.document_size, 164.0);
    }

    #[test]
    fn targeted_filter_on_sharded_stock() {
        let db = shop();
        let mut c = cluster(4);
        c.assign_shard_key(db.collection("Stock").unwrap(), &["IDP"]).unwrap();
        let catalog = Catalog::new(&db, &c, true).unwrap();

        let q = QueryPlan::scan("Stock").filter(FilterParams::new("IDP", 5e-6));
        let est = estimate_query(&q, &catalog, &CostConfig::default()).unwrap();
        let step = &est.steps[0];
        assert_eq!(step.algorithm, Algorithm::ShardIndexScan);
        assert_eq!(step.io.servers_contacted(), 1);
        assert!((step.io.total_bytes() - 60.0).abs() < 1e-6);
        assert_eq!(step.network.bytes, 0.0);
        assert_eq!(est.total, step.cost);
    }

    #[test]
    fn aggregate_then_join_on_the_shard_key_stays_local() {
        let db = shop();
        let mut c = cluster(4);
        c.assign_shard_key(db.collection("OrderLine").unwrap(), &["IDP"]).unwrap();
        c.assign_shard_key(db.collection("Product").unwrap(), &["IDP"]).unwrap();
        let catalog = Catalog::new(&db, &c, true).unwrap();
        let cfg = CostConfig::default();

        let est = estimate_query(&q6(), &catalog, &cfg).unwrap();
        assert_eq!(est.steps.len(), 2);
        assert_eq!(est.steps[0].algorithm, Algorithm::ShardLocalAggregate);
        assert_eq!(est.steps[1].algorithm, Algorithm::ShardNestedLoop);
        assert_eq!(est.steps[1].network.bytes, 0.0);
        assert_eq!(est.total, est.steps[0].cost.combine(&est.steps[1].cost));
        // one output document per product
        assert!((est.output.documents() - 100_000.0).abs() < 1e-6);
    }

    #[test]
    fn same_query_without_sharding_runs_on_one_server() {
        let db = shop();
        let mut c = cluster(4);
        c.assign_shard_key(db.collection("OrderLine").unwrap(), &["IDP"]).unwrap();
        let catalog = Catalog::new(&db, &c, false).unwrap();

        let est = estimate_query(&q6(), &catalog, &CostConfig::default()).unwrap();
        assert_eq!(est.steps[0].algorithm, Algorithm::LocalAggregate);
        assert_eq!(est.steps[1].algorithm, Algorithm::NestedLoop);
        assert_eq!(est.steps[0].io.total_bytes(), 4_000_000.0 * 112.0);
        assert!(est.steps.iter().all(|s| s.network.bytes == 0.0));
    }

    #[test]
    fn operator_errors_surface() {
        let db = shop();
        let c = cluster(2);
        let catalog = Catalog::new(&db, &c, false).unwrap();
        let cfg = CostConfig::default();

        let bad_field = QueryPlan::scan("Stock").filter(FilterParams::new("brand", 0.1));
        assert!(matches!(
            estimate_query(&bad_field, &catalog, &cfg),
            Err(PlanError::Sim(docsim_core::Error::Schema(_)))
        ));

        let bad_key =
            QueryPlan::scan("Stock").join(QueryPlan::scan("Product"), JoinParams::new("IDW"));
        assert!(matches!(
            estimate_query(&bad_key, &catalog, &cfg),
            Err(PlanError::Sim(docsim_core::Error::JoinKey(_)))
        ));

        let mut broken = cfg;
        broken.price_per_kwh = -1.0;
        assert!(matches!(
            estimate_query(&QueryPlan::scan("Stock"), &catalog, &broken),
            Err(PlanError::Sim(docsim_core::Error::Config(_)))
        ));
    }
}
