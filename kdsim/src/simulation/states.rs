//! Core state types for the stepping engine.
//!
//! - `Particle<D>`: one particle as an owned value (what `get`/`set` exchange)
//! - `ParticleStore<D>`: the canonical structure-of-arrays storage
//! - `MatterPhase` / `PhaseThresholds`: temperature-derived phase labels
//!
//! Index `i` names the same particle for the whole run. Every store carries a
//! process-unique id and a revision counter that changes on every mutation, so
//! a spatial index built from another store or an older revision is refused.

use std::sync::atomic::{AtomicU64, Ordering};

use nalgebra::SVector;
use serde::{Deserialize, Serialize};

use super::error::{Result, SimError};
use super::kd_tree::KdTree;

pub type NVec<const D: usize> = SVector<f64, D>;
pub type NVec2 = NVec<2>;
pub type NVec3 = NVec<3>;

/// Phase label derived from temperature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatterPhase {
    Solid,
    Liquid,
    Gas,
}

/// Temperature boundaries between phases
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    pub melt: f64, // solid below, liquid at or above
    pub boil: f64, // gas at or above
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            melt: 500.0,
            boil: 2500.0,
        }
    }
}

impl PhaseThresholds {
    pub fn classify(&self, temperature: f64) -> MatterPhase {
        if temperature < self.melt {
            MatterPhase::Solid
        } else if temperature < self.boil {
            MatterPhase::Liquid
        } else {
            MatterPhase::Gas
        }
    }
}

/// One particle, detached from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Particle<const D: usize> {
    pub x: NVec<D>,           // position
    pub v: NVec<D>,           // velocity
    pub m: f64,               // mass, 0 marks a background particle
    pub q: f64,               // charge
    pub temperature: f64,     // scalar field
    pub entropy: f64,         // scalar field
    pub phase: MatterPhase,   // derived from temperature
}

impl<const D: usize> Particle<D> {
    /// Particle at rest with unit mass and no charge
    pub fn at(x: NVec<D>) -> Self {
        Self {
            x,
            v: NVec::zeros(),
            m: 1.0,
            q: 0.0,
            temperature: 0.0,
            entropy: 0.0,
            phase: MatterPhase::Solid,
        }
    }

    fn validate(&self, i: usize) -> Result<()> {
        if !self.m.is_finite() || self.m < 0.0 {
            return Err(SimError::invalid(format!(
                "particle {i} has mass {}; masses must be finite and >= 0",
                self.m
            )));
        }
        let finite = self.x.iter().chain(self.v.iter()).all(|c| c.is_finite())
            && self.q.is_finite()
            && self.temperature.is_finite()
            && self.entropy.is_finite();
        if !finite {
            return Err(SimError::invalid(format!(
                "particle {i} has a non-finite attribute"
            )));
        }
        Ok(())
    }
}

/// Borrowed read-only view of a single particle, handed to pairwise terms
#[derive(Debug, Clone, Copy)]
pub struct ParticleRef<'a, const D: usize> {
    pub index: usize,
    pub x: &'a NVec<D>,
    pub v: &'a NVec<D>,
    pub m: f64,
    pub q: f64,
    pub temperature: f64,
}

/// Mutable slices over the integrated attributes
pub(crate) struct StateMut<'a, const D: usize> {
    pub x: &'a mut [NVec<D>],
    pub v: &'a mut [NVec<D>],
    pub m: &'a [f64],
    pub temperature: &'a mut [f64],
    pub entropy: &'a mut [f64],
    pub phase: &'a mut [MatterPhase],
}

static NEXT_STORE_ID: AtomicU64 = AtomicU64::new(0);

fn next_store_id() -> u64 {
    NEXT_STORE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Structure-of-arrays particle storage
#[derive(Debug)]
pub struct ParticleStore<const D: usize> {
    x: Vec<NVec<D>>,
    v: Vec<NVec<D>>,
    m: Vec<f64>,
    q: Vec<f64>,
    temperature: Vec<f64>,
    entropy: Vec<f64>,
    phase: Vec<MatterPhase>,
    id: u64,
    revision: u64,
}

// A clone is a separate store and evolves on its own
impl<const D: usize> Clone for ParticleStore<D> {
    fn clone(&self) -> Self {
        Self {
            x: self.x.clone(),
            v: self.v.clone(),
            m: self.m.clone(),
            q: self.q.clone(),
            temperature: self.temperature.clone(),
            entropy: self.entropy.clone(),
            phase: self.phase.clone(),
            id: next_store_id(),
            revision: self.revision,
        }
    }
}

/// k-d tree tagged with the store and revision it was built from
#[derive(Debug, Clone)]
pub struct SpatialIndex<const D: usize> {
    tree: KdTree<D>,
    store: u64,
    revision: u64,
}

impl<const D: usize> SpatialIndex<D> {
    pub fn tree(&self) -> &KdTree<D> {
        &self.tree
    }

    /// Id of the store the tree was built from
    pub fn store_id(&self) -> u64 {
        self.store
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl<const D: usize> ParticleStore<D> {
    /// Allocate `n` particles, each produced by `generator(i)`
    pub fn initialize<F>(n: usize, mut generator: F) -> Result<Self>
    where
        F: FnMut(usize) -> Particle<D>,
    {
        if n == 0 {
            return Err(SimError::invalid("particle count must be positive"));
        }
        let mut store = Self::with_capacity(n);
        for i in 0..n {
            let p = generator(i);
            p.validate(i)?;
            store.push(p);
        }
        Ok(store)
    }

    /// Build a store from explicit particles
    pub fn from_particles(particles: Vec<Particle<D>>) -> Result<Self> {
        if particles.is_empty() {
            return Err(SimError::invalid("particle count must be positive"));
        }
        let mut store = Self::with_capacity(particles.len());
        for (i, p) in particles.into_iter().enumerate() {
            p.validate(i)?;
            store.push(p);
        }
        Ok(store)
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            x: Vec::with_capacity(n),
            v: Vec::with_capacity(n),
            m: Vec::with_capacity(n),
            q: Vec::with_capacity(n),
            temperature: Vec::with_capacity(n),
            entropy: Vec::with_capacity(n),
            phase: Vec::with_capacity(n),
            id: next_store_id(),
            revision: 0,
        }
    }

    fn push(&mut self, p: Particle<D>) {
        self.x.push(p.x);
        self.v.push(p.v);
        self.m.push(p.m);
        self.q.push(p.q);
        self.temperature.push(p.temperature);
        self.entropy.push(p.entropy);
        self.phase.push(p.phase);
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Process-unique identity of this store
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Revision counter, bumped by every mutation
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn check(&self, i: usize) -> Result<()> {
        if i >= self.len() {
            return Err(SimError::IndexOutOfBounds {
                index: i,
                len: self.len(),
            });
        }
        Ok(())
    }

    pub fn get(&self, i: usize) -> Result<Particle<D>> {
        self.check(i)?;
        Ok(Particle {
            x: self.x[i],
            v: self.v[i],
            m: self.m[i],
            q: self.q[i],
            temperature: self.temperature[i],
            entropy: self.entropy[i],
            phase: self.phase[i],
        })
    }

    pub fn set(&mut self, i: usize, p: Particle<D>) -> Result<()> {
        self.check(i)?;
        p.validate(i)?;
        self.x[i] = p.x;
        self.v[i] = p.v;
        self.m[i] = p.m;
        self.q[i] = p.q;
        self.temperature[i] = p.temperature;
        self.entropy[i] = p.entropy;
        self.phase[i] = p.phase;
        self.revision += 1;
        Ok(())
    }

    /// Owned copy of all positions at call time
    pub fn snapshot_positions(&self) -> Vec<NVec<D>> {
        self.x.clone()
    }

    /// Build a fresh spatial index over the current positions
    pub fn spatial_index(&self) -> SpatialIndex<D> {
        SpatialIndex {
            tree: KdTree::build(&self.x),
            store: self.id,
            revision: self.revision,
        }
    }

    pub fn particles(&self) -> Vec<Particle<D>> {
        (0..self.len())
            .map(|i| Particle {
                x: self.x[i],
                v: self.v[i],
                m: self.m[i],
                q: self.q[i],
                temperature: self.temperature[i],
                entropy: self.entropy[i],
                phase: self.phase[i],
            })
            .collect()
    }

    pub fn positions(&self) -> &[NVec<D>] {
        &self.x
    }

    pub fn velocities(&self) -> &[NVec<D>] {
        &self.v
    }

    pub fn masses(&self) -> &[f64] {
        &self.m
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperature
    }

    pub fn entropies(&self) -> &[f64] {
        &self.entropy
    }

    pub fn phases(&self) -> &[MatterPhase] {
        &self.phase
    }

    /// Re-derive every phase label from the current temperatures
    pub fn classify_phases(&mut self, thresholds: &PhaseThresholds) {
        for (p, t) in self.phase.iter_mut().zip(self.temperature.iter()) {
            *p = thresholds.classify(*t);
        }
        self.revision += 1;
    }

    // `i` must be in range; callers iterate over `0..len()`
    pub(crate) fn view(&self, i: usize) -> ParticleRef<'_, D> {
        ParticleRef {
            index: i,
            x: &self.x[i],
            v: &self.v[i],
            m: self.m[i],
            q: self.q[i],
            temperature: self.temperature[i],
        }
    }

    pub(crate) fn state_mut(&mut self) -> StateMut<'_, D> {
        self.revision += 1;
        StateMut {
            x: &mut self.x,
            v: &mut self.v,
            m: &self.m,
            temperature: &mut self.temperature,
            entropy: &mut self.entropy,
            phase: &mut self.phase,
        }
    }
}
