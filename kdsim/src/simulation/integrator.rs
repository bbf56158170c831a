//! Fixed-step integrator for the particle store
//!
//! Semi-implicit Euler driven by one [`InteractionResult`] per tick:
//! velocities are kicked first, then positions drift with the new velocity.
//! Scalar fields advance from the accumulated heat flux.

use super::accumulator::InteractionResult;
use super::error::{Result, SimError};
use super::params::Parameters;
use super::states::ParticleStore;

/// Advance every particle by one step of `params.dt`.
///
/// - `m > 0`: v_n+1 = v_n + (F / m) * dt, then capped to the speed limit
/// - `m == 0`: background particle, velocity untouched
/// - all:     x_n+1 = x_n + v_n+1 * dt
/// - fields:  T += heat * dt, S += (heat / T) * dt while T > 0
pub fn step<const D: usize>(
    store: &mut ParticleStore<D>,
    results: &InteractionResult<D>,
    params: &Parameters,
) {
    let dt = params.dt;
    let speed_limit = params.speed_limit();
    let thresholds = params.phase;

    let state = store.state_mut();

    // Kick + drift
    for (i, (x, v)) in state.x.iter_mut().zip(state.v.iter_mut()).enumerate() {
        let m = state.m[i];
        if m > 0.0 {
            *v += results.force[i] * (dt / m);

            // Speed cap: rescale to the limit keeping direction
            if let Some(limit) = speed_limit {
                let speed = v.norm();
                if speed > limit {
                    *v *= limit / speed;
                }
            }
        }
        *x += *v * dt;
    }

    // Scalar fields
    for (i, (t, s)) in state
        .temperature
        .iter_mut()
        .zip(state.entropy.iter_mut())
        .enumerate()
    {
        let q = results.heat[i] * dt;
        *t += q;
        if *t > 0.0 {
            *s += q / *t;
        }
        state.phase[i] = thresholds.classify(*t);
    }
}

/// Post-integration guard: the first non-finite attribute aborts the run
pub fn check_finite<const D: usize>(store: &ParticleStore<D>, tick: u64) -> Result<()> {
    let degenerate = |particle: usize, quantity: &'static str| SimError::NumericalDegeneracy {
        tick,
        particle,
        quantity,
    };

    for i in 0..store.len() {
        if !store.positions()[i].iter().all(|c| c.is_finite()) {
            return Err(degenerate(i, "position"));
        }
        if !store.velocities()[i].iter().all(|c| c.is_finite()) {
            return Err(degenerate(i, "velocity"));
        }
        if !store.temperatures()[i].is_finite() {
            return Err(degenerate(i, "temperature"));
        }
        if !store.entropies()[i].is_finite() {
            return Err(degenerate(i, "entropy"));
        }
    }
    Ok(())
}
