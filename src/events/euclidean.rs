use super::measure::Measure;
use super::particle::Particle;
use crate::Distance;

/// Straight-line distance in any dimension.
#[derive(Debug, Default, Clone, Copy)]
pub struct Euclidean;

impl<const D: usize> Measure<D> for Euclidean {
    fn distance(&self, x: &Particle<D>, y: &Particle<D>) -> Distance {
        x.coords()
            .iter()
            .zip(y.coords())
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<Distance>()
            .sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_pythagorean_triples() {
        let x = Particle::new(1., [0., 0.]);
        let y = Particle::new(1., [3., 4.]);
        assert_eq!(Euclidean.distance(&x, &y), 5.);
    }

    #[test]
    fn vanishes_at_zero_separation() {
        let x = Particle::new(1., [1., 2., 3.]);
        assert_eq!(Euclidean.distance(&x, &x), 0.);
    }
}
