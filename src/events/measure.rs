use super::particle::Particle;
use crate::Distance;

/// Ground distance between particles in a D-dimensional space.
///
/// Implementations must be deterministic, symmetric, and nonnegative:
/// the symmetric pairwise storage modes fill entry (j, i) from (i, j)
/// and are only correct under that contract.
pub trait Measure<const D: usize>: Sync {
    fn distance(&self, x: &Particle<D>, y: &Particle<D>) -> Distance;
}

impl<M: Measure<D>, const D: usize> Measure<D> for &M {
    fn distance(&self, x: &Particle<D>, y: &Particle<D>) -> Distance {
        (*self).distance(x, y)
    }
}
