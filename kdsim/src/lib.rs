pub mod simulation;
pub mod configuration;
pub mod benchmark;

pub use simulation::error::{SimError, Result};
pub use simulation::states::{Particle, ParticleStore, ParticleRef, SpatialIndex, MatterPhase, PhaseThresholds, NVec, NVec2, NVec3};
pub use simulation::kd_tree::{KdTree, Neighbor};
pub use simulation::forces::{Interaction, InteractionSet, Contribution, Gravity, Coulomb, HeatConduction, Relativistic};
pub use simulation::accumulator::{accumulate, accumulate_in, InteractionResult, Neighborhood};
pub use simulation::params::Parameters;
pub use simulation::engine::{Engine, Simulation, StepStage, StopHandle, run};
pub use simulation::scenario::Scenario;
pub use simulation::snapshot::Snapshot;
pub use simulation::summary::{TickSummary, FieldStats, PhaseCounts};

pub use configuration::config::{ScenarioConfig, EngineConfig, ParametersConfig, InitialConditionsConfig, ParticleConfig};

pub use benchmark::benchmark::{bench_accumulate, bench_step_curve};
