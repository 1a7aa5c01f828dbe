//! Minimal YAML → `QueryPlan` parser for suites of *linear* pipelines.
//!
//! Example:
//! ```yaml
//! cost:
//!   pricePerKwh: 0.20
//! queries:
//!   - name: Q1
//!     steps:
//!       - { op: scan, collection: Stock }
//!       - { op: filter, fields: [IDW], selectivity: 0.0001 }
//!   - name: Q6
//!     steps:
//!       - { op: scan, collection: OrderLine }
//!       - { op: aggregate, group_by: [IDP], groups: 100000 }
//!       - { op: join, collection: Product, key: IDP }
//! ```
//!
//! A join step joins the pipeline so far (left) with a scan of the named
//! collection (right).

use std::collections::{BTreeMap, BTreeSet};

use docsim_core::config::CostConfig;
use docsim_core::error::Error;
use docsim_operators::{AggregateParams, FilterParams, JoinParams};
use serde::{Deserialize, Serialize};

use crate::error::{PlanError, Result};
use crate::plan::QueryPlan;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suite {
    /// Coefficient overrides by camelCase name.
    #[serde(default)]
    pub cost: BTreeMap<String, f64>,
    pub queries: Vec<QueryDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryDef {
    pub name: String,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "op")]
pub enum Step {
    #[serde(rename = "scan")]
    Scan { collection: String },

    #[serde(rename = "filter")]
    Filter {
        fields: Vec<String>,
        selectivity: f64,
        #[serde(default)]
        index: Option<bool>,
    },

    #[serde(rename = "aggregate")]
    Aggregate {
        #[serde(default)]
        group_by: Vec<String>,
        #[serde(default)]
        groups: Option<f64>,
        #[serde(default)]
        group_size: Option<f64>,
    },

    #[serde(rename = "join")]
    Join { collection: String, key: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedQuery {
    pub name: String,
    pub plan: QueryPlan,
}

#[derive(Debug, Clone, Default)]
pub struct ParsedSuite {
    pub queries: Vec<NamedQuery>,
    pub cost_overrides: BTreeMap<String, f64>,
}

impl ParsedSuite {
    /// `base` with the suite's overrides applied. Unknown coefficient names
    /// and invalid values fail with `Config`.
    pub fn cost_config(&self, base: &CostConfig) -> Result<CostConfig> {
        if self.cost_overrides.is_empty() {
            return Ok(*base);
        }
        let value = serde_json::to_value(base).map_err(|e| Error::Config(e.to_string()))?;
        let mut map: BTreeMap<String, f64> =
            serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))?;
        for (name, v) in &self.cost_overrides {
            map.insert(name.clone(), *v);
        }
        Ok(CostConfig::from_map(&map)?)
    }

    pub fn query(&self, name: &str) -> Option<&QueryPlan> {
        self.queries.iter().find(|q| q.name == name).map(|q| &q.plan)
    }
}

fn lower(def: QueryDef) -> Result<NamedQuery> {
    let mut cur: Option<QueryPlan> = None;

    for step in def.steps {
        cur = Some(match (step, cur) {
            (Step::Scan { collection }, None) => QueryPlan::scan(collection),
            (Step::Scan { collection }, Some(_)) => {
                return Err(PlanError::malformed(
                    &def.name,
                    format!("scan of '{collection}' after the first step; use a join step"),
                ));
            }
            (
                Step::Filter {
                    fields,
                    selectivity,
                    index,
                },
                Some(input),
            ) => input.filter(FilterParams {
                fields,
                selectivity,
                uses_index: index,
                is_sharded: false,
            }),
            (
                Step::Aggregate {
                    group_by,
                    groups,
                    group_size,
                },
                Some(input),
            ) => {
                let mut params = AggregateParams::new(group_by);
                if let Some(g) = groups {
                    params = params.with_groups(g);
                }
                if let Some(size) = group_size {
                    params = params.with_group_size(size);
                }
                input.aggregate(params)
            }
            (Step::Join { collection, key }, Some(input)) => {
                input.join(QueryPlan::scan(collection), JoinParams::new(key))
            }
            (s, None) => {
                // linear pipelines start from a collection
                return Err(PlanError::malformed(
                    &def.name,
                    format!("first step must be 'scan', got {s:?}"),
                ));
            }
        });
    }

    let plan = cur.ok_or_else(|| PlanError::malformed(&def.name, "no steps"))?;
    Ok(NamedQuery {
        name: def.name,
        plan,
    })
}

/// Parse a YAML suite into named query plans plus coefficient overrides.
/// Query names must be unique.
pub fn parse_yaml_suite(yaml_src: &str) -> Result<ParsedSuite> {
    let doc: Suite = serde_yaml::from_str(yaml_src)?;

    let mut seen = BTreeSet::new();
    let mut queries = Vec::with_capacity(doc.queries.len());
    for def in doc.queries {
        if !seen.insert(def.name.clone()) {
            return Err(PlanError::malformed(&def.name, "defined twice"));
        }
        queries.push(lower(def)?);
    }

    Ok(ParsedSuite {
        queries,
        cost_overrides: doc.cost,
    })
}
