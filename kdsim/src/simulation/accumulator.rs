//! Per-particle accumulation of pairwise contributions over a neighbor set
//!
//! The neighbor set of particle `i` is either its k nearest neighbors or every
//! particle within a fixed sensing radius, `i` itself excluded in both cases.
//! Particle `i` reads the shared store and index and writes only its own
//! result slot, so the loop runs unchanged on the rayon pool.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::simulation::error::{Result, SimError};
use crate::simulation::forces::{Contribution, Interaction};
use crate::simulation::states::{NVec, ParticleStore, SpatialIndex};

/// Net force and heat flux per particle for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult<const D: usize> {
    pub force: Vec<NVec<D>>,
    pub heat: Vec<f64>,
}

impl<const D: usize> InteractionResult<D> {
    pub fn zeros(n: usize) -> Self {
        Self {
            force: vec![NVec::zeros(); n],
            heat: vec![0.0; n],
        }
    }

    pub fn len(&self) -> usize {
        self.force.len()
    }

    pub fn is_empty(&self) -> bool {
        self.force.is_empty()
    }
}

/// How the interaction partners of each particle are selected
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Neighborhood {
    /// The k nearest other particles, ties by ascending index
    Nearest(usize),
    /// Every other particle within this distance (inclusive)
    Radius(f64),
}

impl Neighborhood {
    pub fn validate(&self) -> Result<()> {
        match *self {
            Neighborhood::Nearest(0) => {
                Err(SimError::invalid("neighbor count must be at least 1"))
            }
            Neighborhood::Radius(r) if !(r.is_finite() && r > 0.0) => Err(SimError::invalid(
                format!("sensing radius must be finite and positive, got {r}"),
            )),
            _ => Ok(()),
        }
    }
}

/// Clamp a requested neighbor count to what a store of `n` particles can supply
pub fn effective_k(k: usize, n: usize) -> usize {
    k.min(n.saturating_sub(1))
}

/// Sum `pairwise(i, j)` over the k nearest neighbors `j != i` of every particle `i`.
///
/// - `index` must have been built from this store at its current revision
/// - `k` above `N - 1` is clamped, so fewer neighbors than requested are used
pub fn accumulate<P, const D: usize>(
    store: &ParticleStore<D>,
    index: &SpatialIndex<D>,
    pairwise: &P,
    k: usize,
    parallel: bool,
) -> Result<InteractionResult<D>>
where
    P: Interaction<D> + Sync + ?Sized,
{
    accumulate_in(store, index, pairwise, Neighborhood::Nearest(k), parallel)
}

/// Sum `pairwise(i, j)` over the neighborhood of every particle `i`
pub fn accumulate_in<P, const D: usize>(
    store: &ParticleStore<D>,
    index: &SpatialIndex<D>,
    pairwise: &P,
    neighborhood: Neighborhood,
    parallel: bool,
) -> Result<InteractionResult<D>>
where
    P: Interaction<D> + Sync + ?Sized,
{
    if index.store_id() != store.id() {
        return Err(SimError::ForeignIndex {
            built_for: index.store_id(),
            store: store.id(),
        });
    }
    if index.revision() != store.revision() {
        return Err(SimError::StaleIndex {
            built: index.revision(),
            current: store.revision(),
        });
    }

    let n = store.len();
    let neighborhood = match neighborhood {
        Neighborhood::Nearest(k) => {
            let k_eff = effective_k(k, n);
            if k_eff < k {
                warn!(requested = k, used = k_eff, particles = n, "neighbor count clamped");
            }
            Neighborhood::Nearest(k_eff)
        }
        radius => radius,
    };

    let tree = index.tree();
    let per_particle = |i: usize| -> (NVec<D>, f64) {
        let a = store.view(i);
        let neighbors = match neighborhood {
            Neighborhood::Nearest(k) => tree.query_k_nearest_excluding(a.x, k, Some(i)),
            Neighborhood::Radius(r) => {
                let mut found = tree.query_radius(a.x, r);
                found.retain(|nb| nb.index != i);
                found
            }
        };
        let mut total = Contribution::zero();
        for nb in neighbors {
            total += pairwise.contribution(a, store.view(nb.index));
        }
        (total.force, total.heat)
    };

    let (force, heat): (Vec<NVec<D>>, Vec<f64>) = if parallel {
        (0..n).into_par_iter().map(per_particle).unzip()
    } else {
        (0..n).map(per_particle).unzip()
    };

    Ok(InteractionResult { force, heat })
}
