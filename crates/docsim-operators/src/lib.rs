#![forbid(unsafe_code)]
//! docsim-operators: analytical cost models for filter, join and aggregate.
//!
//! Design intent:
//! - Every model is a pure function of its inputs and a `CostConfig`.
//! - Inputs and outputs are `Dataset`s (a placed collection or a previous
//!   operator's result) so operators chain.
//! - Time takes the bottleneck server, energy sums over all servers.

pub mod cost;
pub mod dataset;
pub mod plan;
pub mod traits;

pub mod aggregate;
pub mod filter;
pub mod join;

pub use aggregate::{estimate_aggregate, simulate_aggregate, AggregateCost, AggregateParams};
pub use cost::CostResult;
pub use dataset::{Dataset, Partitioning, PlacedCollection, Slice};
pub use filter::{estimate_filter, simulate_filter, FilterCost, FilterParams};
pub use join::{estimate_join, simulate_join, JoinCost, JoinParams};
pub use plan::{Algorithm, IoProfile, NetworkProfile, OperatorEstimate, ServerRead, Transfer};
pub use traits::CostModel;

#[cfg(test)]
mod testing;
