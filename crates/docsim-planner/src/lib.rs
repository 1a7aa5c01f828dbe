#![forbid(unsafe_code)]
//! docsim-planner: from (YAML) query pipelines to chained operator estimates.
//!
//! Design:
//! - `QueryPlan` is a small tree over the three operator cost models plus
//!   `Scan` of a placed collection.
//! - A `Catalog` pins down where every collection lives (sharded on its
//!   assigned key, or whole on the first server).
//! - `estimate_query` walks the tree bottom-up, feeding each operator's
//!   output dataset to its parent and summing the step costs.
//! - The YAML DSL describes linear pipelines only; build `QueryPlan`s
//!   directly for anything else.

pub mod catalog;
pub mod dsl;
pub mod error;
pub mod estimate;
pub mod plan;

pub use catalog::Catalog;
pub use dsl::yaml::{parse_yaml_suite, NamedQuery, ParsedSuite};
pub use error::{PlanError, Result};
pub use estimate::{estimate_query, QueryEstimate};
pub use plan::QueryPlan;

#[cfg(test)]
mod testing;
