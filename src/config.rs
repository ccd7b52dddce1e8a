//! # Simulation configuration
//!
//! Knobs governing the fault-tolerant G-EDF simulation: core counts, fault
//! rates, the Gilbert–Elliott bursty/gap shape, and the number of active
//! backup replicas spawned per job. These are supplied in code at
//! construction sites; [`SimConfig::load`] additionally layers a
//! `schedsim.toml` and `SCHEDSIM_*` environment variables on top of the
//! compiled-in default, for operators who want to override knobs without
//! recompiling.

use serde::{Deserialize, Serialize};

/// Fault and topology parameters plus replication factor for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Total number of cores in the core set.
    pub m: usize,
    /// Number of cores (lowest ids) that are subject to faults.
    pub num_faulty: usize,
    /// Per-tick probability of a permanent core failure.
    pub lambda_c: f64,
    /// Per-tick probability of a transient failure while in the Burst regime.
    pub lambda_b: f64,
    /// Per-tick probability of a transient failure while in the Gap regime.
    pub lambda_r: f64,
    /// Bias of the Gilbert–Elliott regime sampler; higher values produce
    /// shorter gaps and longer bursts.
    pub bursty_chance: f64,
    /// Multiplier applied to both sampled burst and gap lengths.
    pub fault_period_scaler: u32,
    /// Number of active backup replicas spawned per primary job, in
    /// addition to the primary itself.
    pub active_backups: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            m: 2,
            num_faulty: 1,
            lambda_c: 0.001,
            lambda_b: 0.1,
            lambda_r: 0.01,
            bursty_chance: 0.3,
            fault_period_scaler: 5,
            active_backups: 1,
        }
    }
}

impl SimConfig {
    /// Load the default configuration, then merge `schedsim.toml` (if present
    /// in the current directory) and `SCHEDSIM_*` environment variables on
    /// top of it.
    pub fn load() -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let layered = config::Config::builder()
            .add_source(config::Config::try_from(&defaults)?)
            .add_source(config::File::with_name("schedsim").required(false))
            .add_source(config::Environment::with_prefix("SCHEDSIM"))
            .build()?;
        layered.try_deserialize()
    }
}
