//! The capability set every operator cost model exposes.

use docsim_core::config::CostConfig;
use docsim_core::error::Result;

use crate::cost::{energy_of, time_of, CostResult};
use crate::dataset::Dataset;
use crate::plan::{Algorithm, IoProfile, NetworkProfile, OperatorEstimate};

/// A configured operator invocation.
///
/// Invariants:
/// - Parameters are validated at construction; the estimate methods cannot
///   fail.
/// - Every method is a pure function of the model's inputs.
pub trait CostModel {
    /// Stable operator name ("filter", "join", "aggregate").
    fn name(&self) -> &'static str;

    fn algorithm(&self) -> Algorithm;

    /// Bytes read from local storage, per contacted server.
    fn estimate_io(&self) -> IoProfile;

    /// Bytes crossing the network, zero when nothing moves.
    fn estimate_network(&self) -> NetworkProfile;

    /// Joules for every byte read or moved, on any server.
    fn estimate_energy(&self, config: &CostConfig) -> f64 {
        energy_of(&self.estimate_io(), &self.estimate_network(), config)
    }

    /// Result to feed the next operator.
    fn output(&self) -> Dataset;

    fn simulate(&self, config: &CostConfig) -> Result<OperatorEstimate> {
        config.validate()?;
        let io = self.estimate_io();
        let network = self.estimate_network();
        let cost = CostResult::from_parts(
            time_of(&io, &network, config),
            self.estimate_energy(config),
            config,
        );
        Ok(OperatorEstimate {
            operator: self.name().to_string(),
            algorithm: self.algorithm(),
            io,
            network,
            cost,
            output: self.output(),
        })
    }
}
