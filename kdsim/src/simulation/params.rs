//! Numerical and physical parameters for the simulation
//!
//! `Parameters` holds runtime settings:
//! - fixed time step `dt`,
//! - softening `eps2` shared by every inverse-square term,
//! - coupling constants for gravity, Coulomb and heat conduction,
//! - optional propagation speed with its two safety ratios,
//! - phase thresholds

use super::error::{Result, SimError};
use super::forces::{
    Coulomb, Gravity, HeatConduction, InteractionSet, Relativistic, DEFAULT_LORENTZ_RATIO_CAP,
};
use super::states::PhaseThresholds;

pub const DEFAULT_MAX_SPEED_RATIO: f64 = 0.99;

#[derive(Debug, Clone, PartialEq)]
pub struct Parameters {
    pub dt: f64,                        // step size
    pub eps2: f64,                      // softening added to squared distance
    pub g: f64,                         // gravitational constant, 0 disables
    pub k_e: f64,                       // Coulomb constant, 0 disables
    pub heat_transfer: f64,             // conduction coefficient, 0 disables
    pub propagation_speed: Option<f64>, // enables Lorentz scaling and the speed cap
    pub max_speed_ratio: f64,           // speed cap as a fraction of propagation speed
    pub lorentz_ratio_cap: f64,         // cap on |v|/c inside the Lorentz factor
    pub phase: PhaseThresholds,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            dt: 0.01,
            eps2: 1e-4,
            g: 1.0,
            k_e: 0.0,
            heat_transfer: 0.0,
            propagation_speed: None,
            max_speed_ratio: DEFAULT_MAX_SPEED_RATIO,
            lorentz_ratio_cap: DEFAULT_LORENTZ_RATIO_CAP,
            phase: PhaseThresholds::default(),
        }
    }
}

impl Parameters {
    /// Largest speed a massive particle may reach, if a propagation speed is set
    pub fn speed_limit(&self) -> Option<f64> {
        self.propagation_speed.map(|c| self.max_speed_ratio * c)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::invalid(format!("time step must be positive, got {}", self.dt)));
        }
        if !(self.eps2.is_finite() && self.eps2 >= 0.0) {
            return Err(SimError::invalid(format!("softening must be >= 0, got {}", self.eps2)));
        }
        for (name, value) in [
            ("gravity", self.g),
            ("coulomb", self.k_e),
            ("heat_transfer", self.heat_transfer),
        ] {
            if !value.is_finite() {
                return Err(SimError::invalid(format!("{name} coefficient must be finite")));
            }
        }
        if let Some(c) = self.propagation_speed {
            if !(c.is_finite() && c > 0.0) {
                return Err(SimError::invalid(format!(
                    "propagation speed must be positive, got {c}"
                )));
            }
        }
        for (name, ratio) in [
            ("max_speed_ratio", self.max_speed_ratio),
            ("lorentz_ratio_cap", self.lorentz_ratio_cap),
        ] {
            if !(ratio > 0.0 && ratio < 1.0) {
                return Err(SimError::invalid(format!(
                    "{name} must lie strictly between 0 and 1, got {ratio}"
                )));
            }
        }
        if !(self.phase.melt <= self.phase.boil) {
            return Err(SimError::invalid("phase thresholds must satisfy melt <= boil"));
        }
        Ok(())
    }

    /// Interaction set implied by the non-zero coefficients.
    ///
    /// Gravity and Coulomb are wrapped in a Lorentz scaling when a propagation
    /// speed is configured; conduction never is.
    pub fn interactions<const D: usize>(&self) -> InteractionSet<D> {
        let mut mechanical = InteractionSet::<D>::new();
        if self.g != 0.0 {
            mechanical = mechanical.with(Gravity {
                g: self.g,
                eps2: self.eps2,
            });
        }
        if self.k_e != 0.0 {
            mechanical = mechanical.with(Coulomb {
                k_e: self.k_e,
                eps2: self.eps2,
            });
        }

        let mut forces = InteractionSet::<D>::new();
        if !mechanical.is_empty() {
            forces = match self.propagation_speed {
                Some(c) => forces.with(
                    Relativistic::new(mechanical, c).with_ratio_cap(self.lorentz_ratio_cap),
                ),
                None => forces.with(mechanical),
            };
        }
        if self.heat_transfer != 0.0 {
            forces = forces.with(HeatConduction {
                coefficient: self.heat_transfer,
            });
        }
        forces
    }
}
