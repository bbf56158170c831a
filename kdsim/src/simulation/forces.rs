//! Pairwise contributors for the stepping engine
//!
//! A pairwise term looks at two particles `a` and `b` and returns what `b`
//! contributes to `a`: a force vector and a heat flux. Terms implement
//! [`Interaction`] and are combined with [`InteractionSet`], which is itself an
//! `Interaction`, so sets nest (e.g. inside [`Relativistic`]).

use std::ops::{Add, AddAssign};

use crate::simulation::states::{NVec, ParticleRef};

/// What one neighbor contributes to one particle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contribution<const D: usize> {
    pub force: NVec<D>, // force on `a`
    pub heat: f64,      // heat flux into `a`
}

impl<const D: usize> Contribution<D> {
    pub fn zero() -> Self {
        Self {
            force: NVec::zeros(),
            heat: 0.0,
        }
    }

    pub fn force(force: NVec<D>) -> Self {
        Self { force, heat: 0.0 }
    }

    pub fn heat(heat: f64) -> Self {
        Self {
            force: NVec::zeros(),
            heat,
        }
    }
}

impl<const D: usize> Default for Contribution<D> {
    fn default() -> Self {
        Self::zero()
    }
}

impl<const D: usize> Add for Contribution<D> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            force: self.force + rhs.force,
            heat: self.heat + rhs.heat,
        }
    }
}

impl<const D: usize> AddAssign for Contribution<D> {
    fn add_assign(&mut self, rhs: Self) {
        self.force += rhs.force;
        self.heat += rhs.heat;
    }
}

/// Trait for pairwise sources: contribution of `b` to `a`
pub trait Interaction<const D: usize> {
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D>;
}

/// Collection of pairwise terms (gravity, Coulomb, conduction, ...)
/// Contributions of all terms are summed for each pair
pub struct InteractionSet<const D: usize> {
    terms: Vec<Box<dyn Interaction<D> + Send + Sync>>,
}

impl<const D: usize> InteractionSet<D> {
    /// Create an empty set
    pub fn new() -> Self {
        Self { terms: Vec::new() }
    }

    /// Add a term
    pub fn with<T>(mut self, term: T) -> Self
    where
        T: Interaction<D> + Send + Sync + 'static,
    {
        self.terms.push(Box::new(term));
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl<const D: usize> Default for InteractionSet<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> Interaction<D> for InteractionSet<D> {
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D> {
        let mut total = Contribution::zero();
        for term in &self.terms {
            total += term.contribution(a, b);
        }
        total
    }
}

/// `1 / (|r|^2 + eps2)^(3/2)` for the displacement `r`
fn inv_r3_softened<const D: usize>(r: &NVec<D>, eps2: f64) -> f64 {
    let d2 = r.norm_squared() + eps2;
    let inv_r = d2.sqrt().recip();
    inv_r * inv_r * inv_r
}

/// Newtonian gravity with softening
///
/// F_a = G * m_a * m_b * r / (|r|^2 + eps2)^(3/2), r = x_b - x_a
///
/// With `eps2 == 0` two coincident particles give `0 * inf = NaN`; the
/// driver's finite check then aborts the run.
#[derive(Debug, Clone, Copy)]
pub struct Gravity {
    pub g: f64,    // gravitational constant
    pub eps2: f64, // softening added to squared distance
}

impl<const D: usize> Interaction<D> for Gravity {
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D> {
        // r points from a to b, a is pulled along +r
        let r = b.x - a.x;
        let coef = self.g * a.m * b.m * inv_r3_softened(&r, self.eps2);
        Contribution::force(r * coef)
    }
}

/// Coulomb interaction with softening; like charges repel
///
/// F_a = -k_e * q_a * q_b * r / (|r|^2 + eps2)^(3/2), r = x_b - x_a
#[derive(Debug, Clone, Copy)]
pub struct Coulomb {
    pub k_e: f64,
    pub eps2: f64,
}

impl<const D: usize> Interaction<D> for Coulomb {
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D> {
        if a.q == 0.0 || b.q == 0.0 {
            return Contribution::zero();
        }
        let r = b.x - a.x;
        let coef = -self.k_e * a.q * b.q * inv_r3_softened(&r, self.eps2);
        Contribution::force(r * coef)
    }
}

/// Heat flowing from hotter to colder neighbors
#[derive(Debug, Clone, Copy)]
pub struct HeatConduction {
    pub coefficient: f64,
}

impl<const D: usize> Interaction<D> for HeatConduction {
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D> {
        Contribution::heat(self.coefficient * (b.temperature - a.temperature))
    }
}

/// Default cap on `|v| / c` inside the Lorentz factor
pub const DEFAULT_LORENTZ_RATIO_CAP: f64 = 0.999;

/// Scales the force of `inner` by the Lorentz factor of particle `a`.
/// Heat flux passes through unchanged.
pub struct Relativistic<I> {
    pub inner: I,
    pub c: f64,         // propagation speed
    pub ratio_cap: f64, // upper bound on |v| / c, strictly below 1
}

impl<I> Relativistic<I> {
    pub fn new(inner: I, c: f64) -> Self {
        Self {
            inner,
            c,
            ratio_cap: DEFAULT_LORENTZ_RATIO_CAP,
        }
    }

    pub fn with_ratio_cap(mut self, ratio_cap: f64) -> Self {
        self.ratio_cap = ratio_cap;
        self
    }

    /// gamma = 1 / sqrt(1 - beta^2), beta clamped to `ratio_cap`
    pub fn gamma(&self, speed: f64) -> f64 {
        let beta = (speed / self.c).min(self.ratio_cap);
        (1.0 - beta * beta).sqrt().recip()
    }
}

impl<I, const D: usize> Interaction<D> for Relativistic<I>
where
    I: Interaction<D>,
{
    fn contribution(&self, a: ParticleRef<'_, D>, b: ParticleRef<'_, D>) -> Contribution<D> {
        let mut c = self.inner.contribution(a, b);
        c.force *= self.gamma(a.v.norm());
        c
    }
}
