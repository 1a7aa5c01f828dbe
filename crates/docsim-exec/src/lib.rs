#![forbid(unsafe_code)]
//! docsim-exec: scenario runner, bounded parallel scheduling, reports.
//!
//! A `Scenario` bundles one database design, one cluster and the queries to
//! cost against it. `Simulator::run` sizes the database, places it, costs
//! every query and emits a `ScenarioReport` carrying a stable fingerprint of
//! its inputs. `run_all` evaluates independent scenarios on a bounded rayon pool.

pub mod metrics;
pub mod report;
pub mod runtime;
pub mod scenario;
pub mod scheduler;

pub use report::{QueryReport, ReportId, ScenarioReport};
pub use runtime::{ExecError, Simulator};
pub use scenario::{ClusterDesc, Scenario, ScenarioDesc};
pub use scheduler::run_all;

#[cfg(test)]
mod testing;
