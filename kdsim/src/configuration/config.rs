//! Configuration types for loading simulation scenarios from YAML.
//!
//! This module defines a thin, `serde`-deserializable representation of a
//! simulation scenario. A scenario consists of:
//!
//! - [`EngineConfig`]            – dimension, run length, neighbor selection, parallelism
//! - [`ParametersConfig`]        – time step, softening and coupling constants
//! - [`InitialConditionsConfig`] – a seeded random population, or
//! - [`ParticleConfig`]          – an explicit list of particles
//! - [`ScenarioConfig`]          – top-level wrapper loaded from YAML
//!
//! # YAML format
//! ```yaml
//! engine:
//!   dimension: 2            # 2 or 3
//!   total_ticks: 200
//!   neighbors: 8            # k nearest neighbors per particle, or
//!   # radius: 5.0           # every particle within this distance
//!   parallel: true          # accumulate on the rayon pool
//!
//! parameters:
//!   dt: 0.01
//!   softening: 1.0e-4       # eps^2 added to squared distances
//!   gravity: 1.0            # 0 disables the term
//!   coulomb: 0.5            # 0 disables the term
//!   heat_transfer: 0.01     # 0 disables conduction
//!   propagation_speed: 50.0 # optional: Lorentz scaling + speed cap
//!   max_speed_ratio: 0.99
//!   lorentz_ratio_cap: 0.999
//!   phase: { melt: 500.0, boil: 2500.0 }
//!
//! initial:
//!   count: 1000
//!   seed: 42
//!   bounds: [0.0, 100.0]
//!   mass: [0.5, 10.0]
//!   charges: [-1.0, 0.0, 1.0]
//!   temperature: [100.0, 5000.0]
//!   velocity: 0.1
//! ```
//!
//! An explicit `particles:` list may be given instead of `initial:`; when both
//! are present the explicit list wins.

use serde::{Deserialize, Serialize};

use crate::simulation::params::DEFAULT_MAX_SPEED_RATIO;
use crate::simulation::forces::DEFAULT_LORENTZ_RATIO_CAP;
use crate::simulation::states::PhaseThresholds;

/// High-level engine configuration
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct EngineConfig {
    pub dimension: usize, // spatial dimension of positions and velocities
    pub total_ticks: u64, // number of ticks `run` executes
    #[serde(default)]
    pub neighbors: Option<usize>, // k for the nearest-neighbor query, clamped to N - 1
    #[serde(default)]
    pub radius: Option<f64>,      // sensing radius; exclusive with `neighbors`
    #[serde(default)]
    pub parallel: bool,   // distribute accumulation across threads
}

fn default_max_speed_ratio() -> f64 {
    DEFAULT_MAX_SPEED_RATIO
}

fn default_lorentz_ratio_cap() -> f64 {
    DEFAULT_LORENTZ_RATIO_CAP
}

/// Numerical parameters and coupling constants
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParametersConfig {
    pub dt: f64,        // fixed time step
    pub softening: f64, // added to squared separation in every inverse-square term
    #[serde(default)]
    pub gravity: f64,
    #[serde(default)]
    pub coulomb: f64,
    #[serde(default)]
    pub heat_transfer: f64,
    #[serde(default)]
    pub propagation_speed: Option<f64>,
    #[serde(default = "default_max_speed_ratio")]
    pub max_speed_ratio: f64,
    #[serde(default = "default_lorentz_ratio_cap")]
    pub lorentz_ratio_cap: f64,
    #[serde(default)]
    pub phase: PhaseThresholds,
}

fn default_charges() -> Vec<f64> {
    vec![0.0]
}

/// Seeded random population inside an axis-aligned box
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct InitialConditionsConfig {
    pub count: usize,
    pub seed: u64,          // same seed, same population
    pub bounds: [f64; 2],   // [min, max] on every axis
    pub mass: [f64; 2],     // uniform range
    #[serde(default = "default_charges")]
    pub charges: Vec<f64>,  // each particle picks one uniformly
    #[serde(default)]
    pub temperature: [f64; 2],
    #[serde(default)]
    pub velocity: f64,      // each component uniform in [-velocity, velocity]
}

/// Initial state of one explicitly listed particle
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ParticleConfig {
    pub x: Vec<f64>,
    #[serde(default)]
    pub v: Vec<f64>, // empty means at rest
    pub m: f64,
    #[serde(default)]
    pub q: f64,
    #[serde(default)]
    pub temperature: f64,
}

/// Top-level scenario configuration loaded from YAML.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ScenarioConfig {
    pub engine: EngineConfig,
    pub parameters: ParametersConfig,
    #[serde(default)]
    pub initial: Option<InitialConditionsConfig>,
    #[serde(default)]
    pub particles: Vec<ParticleConfig>,
}

impl ScenarioConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(s)
    }
}
