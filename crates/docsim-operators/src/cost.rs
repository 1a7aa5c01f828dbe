//! `CostResult` and the byte -> time/energy/carbon/money composition.

use docsim_core::config::{CostConfig, JOULES_PER_KWH};
use serde::{Deserialize, Serialize};

use crate::plan::{IoProfile, NetworkProfile};

/// Cost of one simulated operator invocation (or a sum of them).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CostResult {
    pub time_seconds: f64,
    pub energy_joules: f64,
    pub carbon_grams: f64,
    pub monetary_cost: f64,
}

impl CostResult {
    pub const ZERO: CostResult = CostResult {
        time_seconds: 0.0,
        energy_joules: 0.0,
        carbon_grams: 0.0,
        monetary_cost: 0.0,
    };

    /// Time = bottleneck read x disk latency + network bytes x network
    /// latency. Energy covers every byte read or moved on any server.
    pub fn from_profiles(io: &IoProfile, network: &NetworkProfile, config: &CostConfig) -> Self {
        Self::from_parts(
            time_of(io, network, config),
            energy_of(io, network, config),
            config,
        )
    }

    /// Carbon and money follow from the energy.
    pub fn from_parts(time_seconds: f64, energy_joules: f64, config: &CostConfig) -> Self {
        Self {
            time_seconds,
            energy_joules,
            carbon_grams: energy_joules * config.carbon_intensity_per_joule,
            monetary_cost: energy_joules / JOULES_PER_KWH * config.price_per_kwh,
        }
    }

    /// Both costs paid one after the other.
    pub fn combine(&self, other: &CostResult) -> CostResult {
        CostResult {
            time_seconds: self.time_seconds + other.time_seconds,
            energy_joules: self.energy_joules + other.energy_joules,
            carbon_grams: self.carbon_grams + other.carbon_grams,
            monetary_cost: self.monetary_cost + other.monetary_cost,
        }
    }

    pub fn energy_kwh(&self) -> f64 {
        self.energy_joules / JOULES_PER_KWH
    }

    /// Money spent running the operation `executions` times.
    pub fn cost_for_executions(&self, executions: u64) -> f64 {
        self.monetary_cost * executions as f64
    }

    /// Money per hour when the operation runs back to back. Zero for an
    /// instantaneous operation.
    pub fn hourly_rate(&self) -> f64 {
        if self.time_seconds > 0.0 {
            3600.0 / self.time_seconds * self.monetary_cost
        } else {
            0.0
        }
    }
}

impl std::iter::Sum for CostResult {
    fn sum<I: Iterator<Item = CostResult>>(iter: I) -> Self {
        iter.fold(CostResult::ZERO, |acc, c| acc.combine(&c))
    }
}

/// Servers work in parallel: the busiest read bounds the time, then the
/// transfer follows.
pub fn time_of(io: &IoProfile, network: &NetworkProfile, config: &CostConfig) -> f64 {
    io.max_bytes() * config.disk_latency_per_byte + network.bytes * config.network_latency_per_byte
}

/// Joules for every byte read or moved, summed over servers.
pub fn energy_of(io: &IoProfile, network: &NetworkProfile, config: &CostConfig) -> f64 {
    (io.total_bytes() + network.bytes) * config.energy_per_byte
}
