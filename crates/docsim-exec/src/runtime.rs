//! Runtime: evaluate one scenario end to end and emit a `ScenarioReport`.
//!
//! Order of work:
//! - fingerprint the inputs (scenario + cost coefficients),
//! - size the database,
//! - place every collection (`Catalog`) and summarize the sharded ones,
//! - cost each query against the placement.

use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use docsim_cluster::ShardingStats;
use docsim_core::config::SimConfig;
use docsim_core::hash::hash_serde;
use docsim_planner::{estimate_query, Catalog, PlanError};
use docsim_size::{SizeEstimator, SizeModel};

use crate::metrics::emit_span;
use crate::report::{QueryReport, ReportId, ScenarioReport};
use crate::scenario::Scenario;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Sim(#[from] docsim_core::Error),
    #[error("planning: {0}")]
    Plan(#[from] PlanError),
    #[error("query '{query}': {source}")]
    Query {
        query: String,
        #[source]
        source: PlanError,
    },
    #[error("hashing error: {0}")]
    Hash(String),
    #[error("worker stopped while simulating '{0}'")]
    Worker(String),
}

/// Owns the configuration shared by every scenario it runs.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    cfg: SimConfig,
    model: SizeModel,
}

impl Simulator {
    pub fn new(cfg: SimConfig) -> Self {
        Self {
            cfg,
            model: SizeModel::default(),
        }
    }

    pub fn with_size_model(mut self, model: SizeModel) -> Self {
        self.model = model;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioReport, ExecError> {
        let started = Instant::now();
        self.cfg.cost.validate()?;
        info!(scenario = %scenario.name, sharded = scenario.sharded, "scenario start");

        let fingerprint = hash_serde(&scenario.fingerprint_input(&self.cfg.cost))
            .map_err(|e| ExecError::Hash(e.to_string()))?;

        let estimator = SizeEstimator::new(self.model, self.cfg.limits);
        let size = estimator.database_report(&scenario.database)?;

        let catalog = Catalog::new(&scenario.database, &scenario.cluster, scenario.sharded)?;
        let sharding: Vec<ShardingStats> = catalog
            .plans()
            .filter(|p| p.is_sharded())
            .map(|p| ShardingStats::on_cluster(p, &scenario.cluster))
            .collect();
        for st in sharding.iter().filter(|st| !st.fits()) {
            warn!(
                collection = %st.collection,
                servers = st.over_capacity.len(),
                "shards exceed server storage"
            );
        }

        let mut queries = Vec::with_capacity(scenario.queries.len());
        for q in &scenario.queries {
            let estimate = estimate_query(&q.plan, &catalog, &self.cfg.cost).map_err(|source| {
                ExecError::Query {
                    query: q.name.clone(),
                    source,
                }
            })?;
            queries.push(QueryReport {
                name: q.name.clone(),
                plan: q.plan.to_string(),
                estimate,
            });
        }

        let report = ScenarioReport {
            id: ReportId::new(),
            scenario: scenario.name.clone(),
            version: docsim_core::VERSION.to_string(),
            fingerprint,
            size,
            sharding,
            queries,
        };

        let total = report.total();
        emit_span(
            "scenario_finished",
            &[
                ("scenario", scenario.name.clone()),
                ("fingerprint", report.fingerprint.to_hex()),
                ("queries", report.queries.len().to_string()),
                ("total_time_seconds", total.time_seconds.to_string()),
                ("total_energy_joules", total.energy_joules.to_string()),
                ("elapsed_ms", started.elapsed().as_millis().to_string()),
            ],
        );
        info!(scenario = %scenario.name, "scenario finished");
        Ok(report)
    }

    /// `run` over every scenario, bounded by `max_parallel_scenarios`.
    pub fn run_all(&self, scenarios: &[Scenario]) -> Vec<Result<ScenarioReport, ExecError>> {
        crate::scheduler::run_all(self, scenarios)
    }
}

#[cfg(test)]
mod tests {
    use docsim_cluster::Server;
    use docsim_core::config::SimLimits;
    use docsim_core::id::ServerId;
    use docsim_operators::{CostResult, FilterParams};
    use docsim_planner::{NamedQuery, QueryPlan};

    use super::*;
    use crate::testing::shop_desc;

    fn scenario(servers: usize, sharded: bool) -> Scenario {
        Scenario::from_desc(shop_desc(servers, sharded), SimLimits::default()).unwrap()
    }

    #[test]
    fn report_covers_size_sharding_and_queries() {
        let report = Simulator::default().run(&scenario(4, true)).unwrap();
        assert_eq!(report.scenario, "shop");
        // Product 164 B x 100k, OrderLine 112 B x 4M
        assert_eq!(report.size.total_bytes, 16_400_000.0 + 448_000_000.0);
        assert_eq!(report.sharding.len(), 2);
        let lines = report.sharding_of("OrderLine").unwrap();
        assert_eq!(lines.total_documents, 4_000_000);
        assert_eq!(lines.max_documents, 1_000_000);

        let q6 = report.query("Q6").unwrap();
        assert_eq!(q6.algorithms(), vec!["Shard / Local Aggregate", "Shard / Nested Loop"]);
        assert_eq!(q6.plan, "join(aggregate(OrderLine, [IDP]), Product, IDP)");
        let q1 = report.query("Q1").unwrap();
        assert_eq!(report.total(), q1.estimate.total.combine(&q6.estimate.total));
    }

    #[test]
    fn shards_over_server_storage_are_reported() {
        let mut desc = shop_desc(4, true);
        desc.cluster.server = Some(Server {
            storage_capacity_bytes: 50_000_000,
            ..Server::new(ServerId::new(0))
        });
        let s = Scenario::from_desc(desc, SimLimits::default()).unwrap();
        let report = Simulator::default().run(&s).unwrap();
        // 448 MB of order lines over 4 servers, 16.4 MB of products
        assert_eq!(report.sharding_of("OrderLine").unwrap().over_capacity.len(), 4);
        assert!(report.sharding_of("Product").unwrap().fits());
    }

    #[test]
    fn local_deployment_on_no_servers_costs_nothing() {
        let report = Simulator::default().run(&scenario(0, false)).unwrap();
        assert!(report.sharding.is_empty());
        assert!(report.size.total_bytes > 0.0);
        assert_eq!(report.total(), CostResult::ZERO);
    }

    #[test]
    fn fingerprint_tracks_inputs_not_runs() {
        let sim = Simulator::default();
        let a = sim.run(&scenario(4, true)).unwrap();
        let b = sim.run(&scenario(4, true)).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(a.fingerprint, b.fingerprint);
        assert!(a.same_results(&b));

        let unsharded = sim.run(&scenario(4, false)).unwrap();
        assert_ne!(a.fingerprint, unsharded.fingerprint);
        assert!(unsharded.sharding.is_empty());

        let mut cfg = SimConfig::default();
        cfg.cost.price_per_kwh *= 2.0;
        let pricier = Simulator::new(cfg).run(&scenario(4, true)).unwrap();
        assert_ne!(a.fingerprint, pricier.fingerprint);
    }

    #[test]
    fn failing_query_is_named() {
        let s = scenario(2, true).with_queries([NamedQuery {
            name: "bad".into(),
            plan: QueryPlan::scan("Product").filter(FilterParams::new("IDW", 0.1)),
        }]);
        let err = Simulator::default().run(&s).unwrap_err();
        assert!(matches!(err, ExecError::Query { ref query, .. } if query == "bad"));
        assert!(err.to_string().contains("IDW"));
    }
}
