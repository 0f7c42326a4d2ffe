use crate::Arbitrary;
use crate::Coord;
use crate::Weight;
use serde::Deserialize;
use serde::Serialize;

/// A weighted point in a D-dimensional ground space.
///
/// The weight is how much stuff sits at the point (transverse momentum,
/// cross section, probability mass) and must be nonnegative. Coordinates
/// are fixed at construction; preprocessors build translated copies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "[Coord; D]: Serialize",
    deserialize = "[Coord; D]: Deserialize<'de>"
))]
pub struct Particle<const D: usize> {
    weight: Weight,
    coords: [Coord; D],
}

impl<const D: usize> Particle<D> {
    pub fn new(weight: Weight, coords: [Coord; D]) -> Self {
        assert!(weight >= 0., "particle weight must be nonnegative");
        Self { weight, coords }
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub fn coords(&self) -> &[Coord; D] {
        &self.coords
    }

    /// the same particle shifted by -offset, weight untouched
    pub fn translate(&self, offset: &[Coord; D]) -> Self {
        let mut coords = self.coords;
        coords.iter_mut().zip(offset).for_each(|(x, o)| *x -= o);
        Self {
            weight: self.weight,
            coords,
        }
    }

    /// the same particle with weight scaled by the given factor
    pub fn scale(&self, factor: Weight) -> Self {
        Self {
            weight: self.weight * factor,
            coords: self.coords,
        }
    }
}

impl<const D: usize> From<(Weight, [Coord; D])> for Particle<D> {
    fn from((weight, coords): (Weight, [Coord; D])) -> Self {
        Self::new(weight, coords)
    }
}

impl<const D: usize> Arbitrary for Particle<D> {
    fn random() -> Self {
        Self::new(
            rand::random::<Weight>(),
            std::array::from_fn(|_| rand::random::<Coord>()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_coordinates_not_weight() {
        let particle = Particle::new(2., [1., 3.]);
        let shifted = particle.translate(&[1., 1.]);
        assert_eq!(shifted.weight(), 2.);
        assert_eq!(shifted.coords(), &[0., 2.]);
    }

    #[test]
    #[should_panic]
    fn rejects_negative_weight() {
        Particle::new(-1., [0.]);
    }
}
