//! Error taxonomy for the stepping engine
//!
//! Every failure is fatal for the run that raised it; nothing is retried

use thiserror::Error;

/// Errors surfaced by the store, the accumulator, the driver and persistence
#[derive(Debug, Error)]
pub enum SimError {
    /// Rejected before the run starts (bad counts, steps, masses, ratios...)
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Particle access outside `[0, len)`
    #[error("particle index {index} out of bounds for a store of {len} particles")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Post-integration finite check failed
    #[error("numerical degeneracy at tick {tick}: particle {particle} has a non-finite {quantity}")]
    NumericalDegeneracy {
        tick: u64,
        particle: usize,
        quantity: &'static str,
    },

    /// Spatial index queried after the store moved on
    #[error("spatial index is stale: built at store revision {built}, store is at revision {current}")]
    StaleIndex { built: u64, current: u64 },

    /// Spatial index built from a different store
    #[error("spatial index was built from store {built_for}, not from store {store}")]
    ForeignIndex { built_for: u64, store: u64 },

    /// Stepping a simulation that already completed its run
    #[error("simulation finished after {tick} ticks; build a new simulation to continue")]
    Finished { tick: u64 },

    /// Stepping a simulation whose previous tick failed
    #[error("simulation aborted during tick {tick}; build a new simulation to continue")]
    Aborted { tick: u64 },

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] postcard::Error),

    #[error("snapshot format error: {0}")]
    SnapshotFormat(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
