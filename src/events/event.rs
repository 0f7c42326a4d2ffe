use super::particle::Particle;
use super::source::Source;
use crate::Arbitrary;
use crate::Coord;
use crate::Weight;
use serde::Deserialize;
use serde::Serialize;

/// An ordered collection of weighted particles with a cached total.
///
/// Particle order never changes a distance, but it is stable so optimal
/// flows can be read back by particle index after a solve. The cached
/// total weight is maintained by construction; nothing here mutates
/// particles in place.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "[Coord; D]: Serialize",
    deserialize = "[Coord; D]: Deserialize<'de>"
))]
pub struct Event<const D: usize> {
    particles: Vec<Particle<D>>,
    total: Weight,
}

impl<const D: usize> Event<D> {
    pub fn particles(&self) -> &[Particle<D>] {
        &self.particles
    }

    pub fn weights(&self) -> impl Iterator<Item = Weight> + '_ {
        self.particles.iter().map(|p| p.weight())
    }

    /// total weight across all particles
    pub fn total(&self) -> Weight {
        self.total
    }

    pub fn n(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// weight-averaged center; the origin once Center has run.
    /// zero-weight events have no meaningful center and get the origin.
    pub fn centroid(&self) -> [Coord; D] {
        match self.total > 0. {
            false => [0.; D],
            true => {
                let mut center = [0.; D];
                for p in self.particles.iter() {
                    for (c, x) in center.iter_mut().zip(p.coords()) {
                        *c += p.weight() * x / self.total;
                    }
                }
                center
            }
        }
    }

    /// rebuild with transformed particles, recomputing the cached total
    pub fn map(self, f: impl FnMut(Particle<D>) -> Particle<D>) -> Self {
        Self::from(self.particles.into_iter().map(f).collect::<Vec<_>>())
    }

    /// the same event rescaled to unit total weight; empty events pass through
    pub fn normalized(self) -> Self {
        match self.total > 0. {
            false => self,
            true => {
                let total = self.total;
                self.map(|p| p.scale(1. / total))
            }
        }
    }

    /// drain a source into a vector of events
    pub fn gather(source: &mut impl Source<D>) -> Vec<Self> {
        source.reset();
        let mut events = Vec::new();
        while source.next() {
            events.push(Self::from(source.particles()));
        }
        events
    }
}

impl<const D: usize> From<Vec<Particle<D>>> for Event<D> {
    fn from(particles: Vec<Particle<D>>) -> Self {
        let total = particles.iter().map(|p| p.weight()).sum();
        Self { particles, total }
    }
}

impl<const D: usize> From<Vec<(Weight, [Coord; D])>> for Event<D> {
    fn from(pairs: Vec<(Weight, [Coord; D])>) -> Self {
        Self::from(pairs.into_iter().map(Particle::from).collect::<Vec<_>>())
    }
}

impl<const D: usize> Arbitrary for Event<D> {
    fn random() -> Self {
        const N: usize = 16;
        Self::from((0..N).map(|_| Particle::random()).collect::<Vec<_>>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_total_weight() {
        let event = Event::from(vec![(1., [0., 0.]), (2., [1., 0.]), (3., [0., 1.])]);
        assert_eq!(event.total(), 6.);
        assert_eq!(event.n(), 3);
    }

    #[test]
    fn computes_weighted_centroid() {
        let event = Event::from(vec![(1., [0.]), (3., [4.])]);
        assert_eq!(event.centroid(), [3.]);
    }

    #[test]
    fn empty_event_centers_at_origin() {
        let event = Event::<2>::default();
        assert_eq!(event.centroid(), [0., 0.]);
        assert_eq!(event.total(), 0.);
    }

    #[test]
    fn normalizes_to_unit_total() {
        let event = Event::from(vec![(1., [0.]), (3., [4.])]).normalized();
        assert!((event.total() - 1.).abs() < 1e-12);
        assert_eq!(event.centroid(), [3.]);
    }

    #[test]
    fn map_recomputes_total() {
        let event = Event::from(vec![(1., [0.]), (2., [1.])]);
        let scaled = event.map(|p| p.scale(2.));
        assert_eq!(scaled.total(), 6.);
    }

    struct Replay {
        data: Vec<Vec<(f64, [f64; 1])>>,
        cursor: usize,
    }

    impl Source<1> for Replay {
        fn reset(&mut self) {
            self.cursor = 0;
        }
        fn next(&mut self) -> bool {
            self.cursor += 1;
            self.cursor <= self.data.len()
        }
        fn particles(&self) -> Vec<Particle<1>> {
            self.data[self.cursor - 1]
                .iter()
                .map(|pair| Particle::from(*pair))
                .collect()
        }
        fn accepted(&self) -> usize {
            self.cursor.min(self.data.len())
        }
    }

    #[test]
    fn gathers_a_source_to_completion() {
        let ref mut source = Replay {
            data: vec![vec![(1., [0.])], vec![(2., [1.]), (3., [2.])]],
            cursor: 0,
        };
        let events = Event::gather(source);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].total(), 1.);
        assert_eq!(events[1].total(), 5.);
        assert_eq!(source.accepted(), 2);
    }
}
