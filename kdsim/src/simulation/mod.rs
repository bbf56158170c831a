pub mod error;
pub mod states;
pub mod params;
pub mod engine;
pub mod forces;
pub mod accumulator;
pub mod integrator;
pub mod scenario;
pub mod kd_tree;
pub mod snapshot;
pub mod summary;
