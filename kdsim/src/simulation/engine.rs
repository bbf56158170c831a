//! Runtime engine settings and the step loop
//!
//! `Engine` selects dimension, run length, neighbor selection and parallelism.
//! `Simulation` owns the store, the interaction set and the tick counter and
//! runs each tick as
//! `Idle -> Building -> Accumulating -> Integrating -> Recording -> (Idle | Done)`.
//! Any failure moves it to `Aborted` for good; a completed run stays `Done`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, debug_span, error, info};

use super::accumulator::{accumulate_in, Neighborhood};
use super::error::{Result, SimError};
use super::forces::InteractionSet;
use super::integrator;
use super::params::Parameters;
use super::scenario::Scenario;
use super::snapshot::Snapshot;
use super::states::ParticleStore;
use super::summary::TickSummary;

#[derive(Debug, Clone, PartialEq)]
pub struct Engine {
    pub dimension: usize,  // spatial dimension, must match the store's D
    pub total_ticks: u64,  // run length
    pub neighborhood: Neighborhood, // interaction partners of each particle
    pub parallel: bool,    // accumulate on the rayon pool
}

// Upper bound on the summary series reserved up front by `run`
const MAX_RESERVED_TICKS: u64 = 1 << 12;

/// Where the driver currently is inside a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStage {
    Idle,
    Building,
    Accumulating,
    Integrating,
    Recording,
    Done,
    Aborted,
}

/// Cooperative stop flag, honored between ticks
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct Simulation<const D: usize> {
    engine: Engine,
    parameters: Parameters,
    store: ParticleStore<D>,
    forces: InteractionSet<D>,
    tick: u64,
    time: f64,
    stage: StepStage,
    stop: StopHandle,
}

impl<const D: usize> Simulation<D> {
    /// Validate the configuration against the store and assemble a simulation at tick 0
    pub fn new(
        engine: Engine,
        parameters: Parameters,
        store: ParticleStore<D>,
        forces: InteractionSet<D>,
    ) -> Result<Self> {
        if engine.dimension != D {
            return Err(SimError::invalid(format!(
                "engine dimension {} does not match particle dimension {D}",
                engine.dimension
            )));
        }
        engine.neighborhood.validate()?;
        if store.len() < 2 {
            return Err(SimError::invalid(format!(
                "at least 2 particles are needed for neighbor interactions, got {}",
                store.len()
            )));
        }
        parameters.validate()?;

        // Forces never touch a background particle, so the cap cannot catch it later
        if let Some(limit) = parameters.speed_limit() {
            for (i, (m, v)) in store.masses().iter().zip(store.velocities()).enumerate() {
                if *m == 0.0 && v.norm() > limit {
                    return Err(SimError::invalid(format!(
                        "background particle {i} moves at {} above the speed limit {limit}",
                        v.norm()
                    )));
                }
            }
        }

        let stage = if engine.total_ticks == 0 {
            StepStage::Done
        } else {
            StepStage::Idle
        };

        Ok(Self {
            engine,
            parameters,
            store,
            forces,
            tick: 0,
            time: 0.0,
            stage,
            stop: StopHandle::default(),
        })
    }

    /// Build from a scenario bundle
    pub fn from_scenario(scenario: Scenario<D>) -> Result<Self> {
        let Scenario {
            engine,
            parameters,
            store,
            forces,
        } = scenario;
        Self::new(engine, parameters, store, forces)
    }

    /// Continue a run from a persisted snapshot
    pub fn resume(
        engine: Engine,
        parameters: Parameters,
        snapshot: Snapshot<D>,
        forces: InteractionSet<D>,
    ) -> Result<Self> {
        let store = ParticleStore::from_particles(snapshot.particles)?;
        let mut sim = Self::new(engine, parameters, store, forces)?;
        sim.tick = snapshot.tick;
        sim.time = snapshot.time;
        if sim.tick >= sim.engine.total_ticks {
            sim.stage = StepStage::Done;
        }
        Ok(sim)
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn store(&self) -> &ParticleStore<D> {
        &self.store
    }

    pub fn into_store(self) -> ParticleStore<D> {
        self.store
    }

    /// Number of completed ticks
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn stage(&self) -> StepStage {
        self.stage
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Full persisted state at the current tick
    pub fn snapshot(&self) -> Snapshot<D> {
        Snapshot {
            tick: self.tick,
            time: self.time,
            particles: self.store.particles(),
        }
    }

    /// Run one tick and return its summary
    pub fn step(&mut self) -> Result<TickSummary> {
        match self.stage {
            StepStage::Aborted => return Err(SimError::Aborted { tick: self.tick }),
            StepStage::Done => return Err(SimError::Finished { tick: self.tick }),
            _ => {}
        }

        let tick = self.tick;
        let _span = debug_span!("tick", tick).entered();

        match self.advance(tick) {
            Ok(summary) => {
                debug!(
                    tick,
                    mean_speed = summary.mean_speed,
                    t_mean = summary.temperature.mean,
                    "tick complete"
                );
                Ok(summary)
            }
            Err(err) => {
                error!(tick, stage = ?self.stage, %err, "tick failed, aborting run");
                self.stage = StepStage::Aborted;
                Err(err)
            }
        }
    }

    fn advance(&mut self, tick: u64) -> Result<TickSummary> {
        // Build: fresh index over this tick's positions
        self.stage = StepStage::Building;
        let index = self.store.spatial_index();

        // Accumulate: read-only over store and index
        self.stage = StepStage::Accumulating;
        let results = accumulate_in(
            &self.store,
            &index,
            &self.forces,
            self.engine.neighborhood,
            self.engine.parallel,
        )?;
        drop(index);

        // Integrate: the single writer of the tick
        self.stage = StepStage::Integrating;
        integrator::step(&mut self.store, &results, &self.parameters);
        integrator::check_finite(&self.store, tick)?;

        // Record
        self.stage = StepStage::Recording;
        self.tick += 1;
        self.time += self.parameters.dt;
        let summary = TickSummary::record(tick, self.time, &self.store);

        self.stage = if self.tick >= self.engine.total_ticks {
            StepStage::Done
        } else {
            StepStage::Idle
        };
        Ok(summary)
    }

    /// Step until `engine.total_ticks` ticks are complete or a stop is requested
    pub fn run(&mut self) -> Result<Vec<TickSummary>> {
        let remaining = self.engine.total_ticks.saturating_sub(self.tick);
        info!(
            particles = self.store.len(),
            dimension = D,
            from_tick = self.tick,
            remaining,
            neighborhood = ?self.engine.neighborhood,
            parallel = self.engine.parallel,
            "starting run"
        );

        let mut series = Vec::with_capacity(remaining.min(MAX_RESERVED_TICKS) as usize);
        while self.tick < self.engine.total_ticks {
            if self.stop.is_stop_requested() {
                info!(tick = self.tick, "stop requested, ending run");
                break;
            }
            series.push(self.step()?);
        }

        info!(ticks = series.len(), time = self.time, "run finished");
        Ok(series)
    }
}

/// Build a simulation from `scenario` and run it to completion
pub fn run<const D: usize>(scenario: Scenario<D>) -> Result<Vec<TickSummary>> {
    Simulation::from_scenario(scenario)?.run()
}
