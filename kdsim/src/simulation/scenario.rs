//! Build fully-initialized simulation scenarios from configuration
//!
//! Takes a `ScenarioConfig` (YAML-facing) and produces the runtime bundle
//! `Scenario<D>` containing:
//! - engine settings (`Engine`)
//! - numerical parameters (`Parameters`)
//! - the particle store at t = 0
//! - the active interaction set (`InteractionSet`)
//!
//! `Simulation::from_scenario` consumes the bundle.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::configuration::config::{
    EngineConfig, InitialConditionsConfig, ParticleConfig, ScenarioConfig,
};
use crate::simulation::accumulator::Neighborhood;
use crate::simulation::engine::Engine;
use crate::simulation::error::{Result, SimError};
use crate::simulation::forces::InteractionSet;
use crate::simulation::params::Parameters;
use crate::simulation::states::{MatterPhase, NVec, Particle, ParticleStore};

pub struct Scenario<const D: usize> {
    pub engine: Engine,
    pub parameters: Parameters,
    pub store: ParticleStore<D>,
    pub forces: InteractionSet<D>,
}

impl<const D: usize> Scenario<D> {
    pub fn build_scenario(cfg: &ScenarioConfig) -> Result<Self> {
        // Engine (runtime) from EngineConfig
        let e_cfg = &cfg.engine;
        let engine = Engine {
            dimension: e_cfg.dimension,
            total_ticks: e_cfg.total_ticks,
            neighborhood: neighborhood_from(e_cfg)?,
            parallel: e_cfg.parallel,
        };
        if engine.dimension != D {
            return Err(SimError::invalid(format!(
                "scenario dimension {} cannot build a {D}-dimensional simulation",
                engine.dimension
            )));
        }

        // Parameters (runtime) from ParametersConfig
        let p_cfg = &cfg.parameters;
        let parameters = Parameters {
            dt: p_cfg.dt,
            eps2: p_cfg.softening,
            g: p_cfg.gravity,
            k_e: p_cfg.coulomb,
            heat_transfer: p_cfg.heat_transfer,
            propagation_speed: p_cfg.propagation_speed,
            max_speed_ratio: p_cfg.max_speed_ratio,
            lorentz_ratio_cap: p_cfg.lorentz_ratio_cap,
            phase: p_cfg.phase,
        };
        parameters.validate()?;

        // Particles: explicit list first, generated population otherwise
        let mut store = if !cfg.particles.is_empty() {
            let particles = cfg
                .particles
                .iter()
                .enumerate()
                .map(|(i, pc)| particle_from_config::<D>(i, pc))
                .collect::<Result<Vec<_>>>()?;
            ParticleStore::from_particles(particles)?
        } else if let Some(init) = &cfg.initial {
            generate_population::<D>(init)?
        } else {
            return Err(SimError::invalid(
                "scenario needs either `particles` or `initial`",
            ));
        };
        store.classify_phases(&parameters.phase);

        // Forces from the non-zero coefficients
        let forces = parameters.interactions::<D>();

        Ok(Self {
            engine,
            parameters,
            store,
            forces,
        })
    }
}

fn neighborhood_from(cfg: &EngineConfig) -> Result<Neighborhood> {
    match (cfg.neighbors, cfg.radius) {
        (Some(k), None) => Ok(Neighborhood::Nearest(k)),
        (None, Some(r)) => Ok(Neighborhood::Radius(r)),
        (Some(_), Some(_)) => Err(SimError::invalid(
            "engine takes either `neighbors` or `radius`, not both",
        )),
        (None, None) => Err(SimError::invalid("engine needs `neighbors` or `radius`")),
    }
}

fn vector_from<const D: usize>(i: usize, name: &str, values: &[f64]) -> Result<NVec<D>> {
    if values.is_empty() {
        return Ok(NVec::zeros());
    }
    if values.len() != D {
        return Err(SimError::invalid(format!(
            "particle {i}: `{name}` has {} components, expected {D}",
            values.len()
        )));
    }
    Ok(NVec::from_column_slice(values))
}

fn particle_from_config<const D: usize>(i: usize, pc: &ParticleConfig) -> Result<Particle<D>> {
    if pc.x.len() != D {
        return Err(SimError::invalid(format!(
            "particle {i}: `x` has {} components, expected {D}",
            pc.x.len()
        )));
    }
    Ok(Particle {
        x: vector_from(i, "x", &pc.x)?,
        v: vector_from(i, "v", &pc.v)?,
        m: pc.m,
        q: pc.q,
        temperature: pc.temperature,
        entropy: 0.0,
        phase: MatterPhase::Solid,
    })
}

fn check_range(name: &str, range: [f64; 2]) -> Result<()> {
    // The sampler needs the width itself to be finite
    if !((range[1] - range[0]).is_finite() && range[0] <= range[1]) {
        return Err(SimError::invalid(format!(
            "`{name}` must be a finite [min, max] range, got {range:?}"
        )));
    }
    Ok(())
}

/// Seeded uniform population; the same config always yields the same store
pub fn generate_population<const D: usize>(
    init: &InitialConditionsConfig,
) -> Result<ParticleStore<D>> {
    check_range("bounds", init.bounds)?;
    check_range("mass", init.mass)?;
    check_range("temperature", init.temperature)?;
    if init.mass[0] <= 0.0 {
        return Err(SimError::invalid(format!(
            "generated masses must be positive, got range {:?}",
            init.mass
        )));
    }
    if !((2.0 * init.velocity).is_finite() && init.velocity >= 0.0) {
        return Err(SimError::invalid(format!(
            "`velocity` must be >= 0 with a finite range, got {}",
            init.velocity
        )));
    }

    let mut rng = SmallRng::seed_from_u64(init.seed);
    let [lo, hi] = init.bounds;
    let vmax = init.velocity;

    ParticleStore::initialize(init.count, |_| Particle {
        x: NVec::from_fn(|_, _| rng.gen_range(lo..=hi)),
        v: NVec::from_fn(|_, _| rng.gen_range(-vmax..=vmax)),
        m: rng.gen_range(init.mass[0]..=init.mass[1]),
        q: init.charges.choose(&mut rng).copied().unwrap_or(0.0),
        temperature: rng.gen_range(init.temperature[0]..=init.temperature[1]),
        entropy: 0.0,
        phase: MatterPhase::Solid,
    })
}
