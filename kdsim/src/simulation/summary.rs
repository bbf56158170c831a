//! Per-tick aggregate statistics handed to reporting layers

use serde::{Deserialize, Serialize};

use super::states::{MatterPhase, ParticleStore};

/// Mean and extrema of one scalar field
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl FieldStats {
    pub fn of(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                min: 0.0,
                max: 0.0,
            };
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for &v in values {
            min = min.min(v);
            max = max.max(v);
            sum += v;
        }
        Self {
            mean: sum / values.len() as f64,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseCounts {
    pub solid: usize,
    pub liquid: usize,
    pub gas: usize,
}

impl PhaseCounts {
    pub fn of(phases: &[MatterPhase]) -> Self {
        let mut counts = Self::default();
        for p in phases {
            match p {
                MatterPhase::Solid => counts.solid += 1,
                MatterPhase::Liquid => counts.liquid += 1,
                MatterPhase::Gas => counts.gas += 1,
            }
        }
        counts
    }
}

/// One row of the run's time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSummary {
    pub tick: u64, // index of the completed tick, starting at 0
    pub time: f64, // simulated time at the end of the tick
    pub temperature: FieldStats,
    pub entropy: FieldStats,
    pub mean_speed: f64,
    pub phases: PhaseCounts,
}

impl TickSummary {
    pub fn record<const D: usize>(tick: u64, time: f64, store: &ParticleStore<D>) -> Self {
        let speeds = store.velocities().iter().map(|v| v.norm());
        let mean_speed = if store.is_empty() {
            0.0
        } else {
            speeds.sum::<f64>() / store.len() as f64
        };

        Self {
            tick,
            time,
            temperature: FieldStats::of(store.temperatures()),
            entropy: FieldStats::of(store.entropies()),
            mean_speed,
            phases: PhaseCounts::of(store.phases()),
        }
    }

    /// CSV header matching [`TickSummary::csv_row`]
    pub fn csv_header() -> &'static str {
        "tick,time,t_mean,t_min,t_max,s_mean,s_min,s_max,mean_speed,solid,liquid,gas"
    }

    pub fn csv_row(&self) -> String {
        format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6e},{:.6e},{:.6e},{:.6},{},{},{}",
            self.tick,
            self.time,
            self.temperature.mean,
            self.temperature.min,
            self.temperature.max,
            self.entropy.mean,
            self.entropy.min,
            self.entropy.max,
            self.mean_speed,
            self.phases.solid,
            self.phases.liquid,
            self.phases.gas,
        )
    }
}
