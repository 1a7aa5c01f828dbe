//! Cost coefficients and simulation limits that downstream crates can
//! serialize/deserialize.
//!
//! Coefficients are always passed explicitly into every simulation call;
//! nothing here is process-wide state.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Joules in one kilowatt-hour.
pub const JOULES_PER_KWH: f64 = 3_600_000.0;

const MIB: f64 = 1024.0 * 1024.0;

/// Per-unit coefficients consumed by the operator cost models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CostConfig {
    /// Seconds to read one byte from local storage.
    pub disk_latency_per_byte: f64,

    /// Seconds to move one byte between two servers.
    pub network_latency_per_byte: f64,

    /// Joules spent per byte read or transferred.
    pub energy_per_byte: f64,

    /// Grams of CO2-equivalent per joule.
    pub carbon_intensity_per_joule: f64,

    /// Currency units per kWh.
    pub price_per_kwh: f64,
}

impl Default for CostConfig {
    fn default() -> Self {
        // 100 MiB/s disks, 10 MiB/s links, 200 W per server while busy,
        // 50 gCO2e/kWh grid, 0.15 per kWh.
        let disk_latency_per_byte = 1.0 / (100.0 * MIB);
        Self {
            disk_latency_per_byte,
            network_latency_per_byte: 1.0 / (10.0 * MIB),
            energy_per_byte: 200.0 * disk_latency_per_byte,
            carbon_intensity_per_joule: 50.0 / JOULES_PER_KWH,
            price_per_kwh: 0.15,
        }
    }
}

impl CostConfig {
    /// All coefficients must be finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let named = [
            ("diskLatencyPerByte", self.disk_latency_per_byte),
            ("networkLatencyPerByte", self.network_latency_per_byte),
            ("energyPerByte", self.energy_per_byte),
            ("carbonIntensityPerJoule", self.carbon_intensity_per_joule),
            ("pricePerKwh", self.price_per_kwh),
        ];
        for (name, v) in named {
            if !v.is_finite() || v < 0.0 {
                return Err(Error::Config(format!(
                    "coefficient '{name}' must be a non-negative number, got {v}"
                )));
            }
        }
        Ok(())
    }

    /// Build from a coefficient-name → value mapping. Every coefficient must
    /// be present; unknown names are rejected.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self> {
        let value = serde_json::to_value(map).map_err(|e| Error::Config(e.to_string()))?;
        let cfg: CostConfig =
            serde_json::from_value(value).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Create coefficients from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `DOCSIM_DISK_LATENCY_PER_BYTE`
    /// - `DOCSIM_NETWORK_LATENCY_PER_BYTE`
    /// - `DOCSIM_ENERGY_PER_BYTE`
    /// - `DOCSIM_CARBON_INTENSITY_PER_JOULE`
    /// - `DOCSIM_PRICE_PER_KWH`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(v) = env_f64("DOCSIM_DISK_LATENCY_PER_BYTE") {
            cfg.disk_latency_per_byte = v;
        }
        if let Some(v) = env_f64("DOCSIM_NETWORK_LATENCY_PER_BYTE") {
            cfg.network_latency_per_byte = v;
        }
        if let Some(v) = env_f64("DOCSIM_ENERGY_PER_BYTE") {
            cfg.energy_per_byte = v;
        }
        if let Some(v) = env_f64("DOCSIM_CARBON_INTENSITY_PER_JOULE") {
            cfg.carbon_intensity_per_joule = v;
        }
        if let Some(v) = env_f64("DOCSIM_PRICE_PER_KWH") {
            cfg.price_per_kwh = v;
        }

        cfg
    }
}

/// Input-size guards checked at the entry of flattening and distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimLimits {
    /// Largest cluster the distributor accepts.
    pub max_servers: usize,
    /// Deepest nesting (documents inside documents/arrays) flattening follows.
    pub max_nesting_depth: usize,
    /// Largest number of shard-key values the distributor enumerates.
    pub max_enumerated_key_values: usize,
}

impl Default for SimLimits {
    fn default() -> Self {
        Self {
            max_servers: 100_000,
            max_nesting_depth: 32,
            max_enumerated_key_values: 1_000_000,
        }
    }
}

/// Everything a scenario run needs besides the scenario itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    pub cost: CostConfig,
    pub limits: SimLimits,
    /// Upper bound on scenarios evaluated concurrently. 1 = sequential.
    pub max_parallel_scenarios: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cost: CostConfig::default(),
            limits: SimLimits::default(),
            max_parallel_scenarios: 4,
        }
    }
}

impl SimConfig {
    /// Coefficients from `CostConfig::from_env`, plus
    /// `DOCSIM_MAX_PARALLEL_SCENARIOS`.
    pub fn from_env() -> Self {
        let mut cfg = Self {
            cost: CostConfig::from_env(),
            ..Self::default()
        };

        if let Ok(s) = std::env::var("DOCSIM_MAX_PARALLEL_SCENARIOS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_parallel_scenarios = v.max(1);
            }
        }

        cfg
    }
}

fn env_f64(key: &str) -> Option<f64> {
    std::env::var(key).ok().and_then(|s| s.parse::<f64>().ok())
}
