use super::config::Config;
use super::config::Extra;
use super::error::Error;
use crate::events::Event;
use crate::events::Externals;
use crate::events::Measure;
use crate::events::Preprocess;
use crate::transport::Simplex;
use crate::transport::Status;
use crate::Distance;
use crate::Weight;
use std::time::Duration;
use std::time::Instant;

/// Which side of the last problem received the balancing extra particle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    #[default]
    Neither,
    Lhs,
    Rhs,
}

/// Computes the earth mover's distance between two events.
///
/// Owns the scratch for one transportation problem at a time, so a
/// single instance amortizes its allocations across a long sequence of
/// computations; parallel drivers build one per worker instead of
/// sharing. After every compute the full diagnostics of the solve stay
/// readable: status, raw objective, flows, pivot count, duration.
pub struct EMD<M, const D: usize> {
    config: Config,
    measure: M,
    pipeline: Vec<Box<dyn Preprocess<D>>>,
    simplex: Simplex,
    supplies: Vec<Weight>,
    demands: Vec<Weight>,
    dists: Vec<Distance>,
    status: Status,
    raw: Distance,
    scale: Weight,
    side: Side,
    duration: Duration,
}

impl<M, const D: usize> From<(M, Config)> for EMD<M, D> {
    fn from((measure, config): (M, Config)) -> Self {
        Self {
            simplex: Simplex::new(
                config.n_iter_max,
                config.epsilon_large_factor,
                config.epsilon_small_factor,
            ),
            config,
            measure,
            pipeline: Vec::new(),
            supplies: Vec::new(),
            demands: Vec::new(),
            dists: Vec::new(),
            status: Status::default(),
            raw: 0.,
            scale: 0.,
            side: Side::default(),
            duration: Duration::ZERO,
        }
    }
}

impl<M, const D: usize> EMD<M, D> {
    pub fn new(measure: M) -> Self {
        Self::from((measure, Config::default()))
    }

    /// register a preprocessor; applied to both events, in registration order
    pub fn preprocess(mut self, preprocessor: impl Preprocess<D> + 'static) -> Self {
        self.pipeline.push(Box::new(preprocessor));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// status of the last computation
    pub fn status(&self) -> Status {
        self.status
    }

    /// objective of the last computation before normalization
    pub fn raw(&self) -> Distance {
        self.raw
    }

    /// larger of the two total weights in the last computation
    pub fn scale(&self) -> Weight {
        self.scale
    }

    /// which event the extra particle landed in, if either
    pub fn side(&self) -> Side {
        self.side
    }

    /// wall-clock duration of the last solve, zero unless timing is on
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// pivots the last solve used
    pub fn iterations(&self) -> usize {
        self.simplex.iterations()
    }

    /// Mass moved from particle i of the first event to particle j of
    /// the second in the last optimal plan. The extra particle, when
    /// present, sits at the trailing index of its side.
    pub fn flow(&self, i: usize, j: usize) -> Weight {
        self.simplex.flow(i, j)
    }

    /// the full row-major flow matrix of the last optimal plan
    pub fn flows(&self) -> &[Weight] {
        self.simplex.flows()
    }

    /// supply and demand counts of the last problem, extra included
    pub fn shape(&self) -> (usize, usize) {
        (self.supplies.len(), self.demands.len())
    }

    /// the last objective with the normalization policy applied
    pub fn value(&self) -> Distance {
        match self.config.norm && self.scale > 0. {
            true => self.raw / self.scale,
            false => self.raw,
        }
    }

    /// cost of one unit of unmatched weight
    fn extra(&self) -> Distance {
        match self.config.extra {
            Extra::Cutoff => self.amplify(self.config.r),
            Extra::Free => 0.,
        }
    }

    /// raise a ground distance to beta. unit beta is the common case
    /// and must stay bit-exact, so it skips the pow entirely.
    fn amplify(&self, distance: Distance) -> Distance {
        match self.config.beta == 1. {
            true => distance,
            false => distance.powf(self.config.beta),
        }
    }

    /// Fill the supply and demand arrays and insert the extra particle
    /// on the lighter side. After this runs both sides sum to the same
    /// total, whichever way the raw totals leaned.
    fn balance(&mut self, lhs: impl Iterator<Item = Weight>, rhs: impl Iterator<Item = Weight>) {
        self.supplies.clear();
        self.supplies.extend(lhs);
        self.demands.clear();
        self.demands.extend(rhs);
        let lhs = self.supplies.iter().sum::<Weight>();
        let rhs = self.demands.iter().sum::<Weight>();
        self.scale = lhs.max(rhs);
        let diff = rhs - lhs;
        self.side = match diff.total_cmp(&0.) {
            std::cmp::Ordering::Greater => {
                self.supplies.push(diff);
                Side::Lhs
            }
            std::cmp::Ordering::Less => {
                self.demands.push(-diff);
                Side::Rhs
            }
            std::cmp::Ordering::Equal => Side::Neither,
        };
    }

    /// hand the balanced problem to the simplex and translate its
    /// status into the caller-facing result
    fn minimize(&mut self) -> Result<Distance, Error> {
        let clock = Instant::now();
        self.status = match self.scale > 0. {
            true => self
                .simplex
                .solve(&self.supplies, &self.demands, &self.dists),
            false => Status::Empty,
        };
        self.raw = match self.status {
            Status::Success => self.simplex.objective(),
            _ => 0.,
        };
        self.duration = match self.config.timing {
            true => clock.elapsed(),
            false => Duration::ZERO,
        };
        if self.status != Status::Success {
            log::debug!(
                "solve came back {} on a {} x {} problem",
                self.status,
                self.supplies.len(),
                self.demands.len()
            );
        }
        match self.status {
            Status::Success => Ok(self.value()),
            status => Err(Error::Solver { status, pair: None }),
        }
    }
}

impl<M: Measure<D>, const D: usize> EMD<M, D> {
    /// Earth mover's distance between two events: balance the totals
    /// with an extra particle, price every pairing through the ground
    /// measure raised to beta, and solve the transportation problem.
    pub fn compute(&mut self, lhs: &Event<D>, rhs: &Event<D>) -> Result<Distance, Error> {
        let lhs = self.apply(lhs.clone());
        let rhs = self.apply(rhs.clone());
        self.balance(lhs.weights(), rhs.weights());
        self.assemble(&lhs, &rhs);
        self.minimize()
    }

    /// run the preprocessor pipeline over one event
    fn apply(&self, event: Event<D>) -> Event<D> {
        self.pipeline
            .iter()
            .fold(event, |event, p| p.transform(event))
    }

    /// dense cost matrix over the balanced problem, extra row or column
    /// included, every entry raised to beta
    fn assemble(&mut self, lhs: &Event<D>, rhs: &Event<D>) {
        let extra = self.extra();
        let rows = self.supplies.len();
        let cols = self.demands.len();
        self.dists.clear();
        self.dists.reserve(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                self.dists
                    .push(match (lhs.particles().get(i), rhs.particles().get(j)) {
                        (Some(x), Some(y)) => self.amplify(self.measure.distance(x, y)),
                        _ => extra,
                    });
            }
        }
    }
}

impl EMD<Externals, 0> {
    /// External-distances mode: no particles, just two weight arrays
    /// and the ground distances supplied up front. The externals shape
    /// must match the weight counts exactly.
    pub fn compute_weighted(&mut self, lhs: &[Weight], rhs: &[Weight]) -> Result<Distance, Error> {
        if self.measure.rows() != lhs.len() || self.measure.cols() != rhs.len() {
            return Err(Error::Length {
                expected: self.measure.rows() * self.measure.cols(),
                actual: lhs.len() * rhs.len(),
            });
        }
        self.balance(lhs.iter().copied(), rhs.iter().copied());
        let extra = self.extra();
        let rows = self.supplies.len();
        let cols = self.demands.len();
        self.dists.clear();
        self.dists.reserve(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                self.dists.push(match i < lhs.len() && j < rhs.len() {
                    true => self.amplify(self.measure.at(i, j)),
                    false => extra,
                });
            }
        }
        self.minimize()
    }
}

impl<M, const D: usize> std::fmt::Display for EMD<M, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "earth mover's distance")?;
        write!(f, "{}", self.config)?;
        writeln!(f, "  status: {}", self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Center;
    use crate::events::Euclidean;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.)
    }

    #[test]
    fn moves_unit_mass_across_unit_distance() {
        let mut emd = EMD::<_, 2>::new(Euclidean);
        let lhs = Event::from(vec![(1., [0., 0.])]);
        let rhs = Event::from(vec![(1., [1., 0.])]);
        assert_eq!(emd.compute(&lhs, &rhs).unwrap(), 1.);
        assert_eq!(emd.status(), Status::Success);
        assert_eq!(emd.side(), Side::Neither);
    }

    #[test]
    fn self_distance_is_exactly_zero() {
        let mut emd = EMD::<_, 2>::new(Euclidean);
        let event = Event::from(vec![(1., [0., 0.]), (2., [1., 0.]), (3., [0., 2.])]);
        assert_eq!(emd.compute(&event, &event).unwrap(), 0.);
        assert_eq!(emd.side(), Side::Neither);
    }

    #[test]
    fn charges_unmatched_weight_the_cutoff() {
        // identical positions, so the only cost is the extra particle
        // absorbing one unit of weight at R
        let config = Config {
            r: 5.,
            ..Config::default()
        };
        let mut emd = EMD::<_, 2>::from((Euclidean, config));
        let lhs = Event::from(vec![(2., [0., 0.])]);
        let rhs = Event::from(vec![(1., [0., 0.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 5.));
        assert_eq!(emd.side(), Side::Rhs);
        assert_eq!(emd.shape(), (1, 2));
    }

    #[test]
    fn normalization_divides_by_the_heavier_total() {
        let config = Config {
            r: 5.,
            norm: true,
            ..Config::default()
        };
        let mut emd = EMD::<_, 2>::from((Euclidean, config));
        let lhs = Event::from(vec![(2., [0., 0.])]);
        let rhs = Event::from(vec![(1., [0., 0.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 2.5));
        assert!(close(emd.raw(), 5.));
        assert!(close(emd.scale(), 2.));
    }

    #[test]
    fn frees_unmatched_weight_on_request() {
        let config = Config {
            r: 5.,
            extra: Extra::Free,
            ..Config::default()
        };
        let mut emd = EMD::<_, 2>::from((Euclidean, config));
        let lhs = Event::from(vec![(2., [0., 0.])]);
        let rhs = Event::from(vec![(1., [0., 0.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 0.));
    }

    #[test]
    fn empty_events_are_an_error_with_zero_raw() {
        let mut emd = EMD::<_, 2>::new(Euclidean);
        let lhs = Event::default();
        let rhs = Event::default();
        let result = emd.compute(&lhs, &rhs);
        assert_eq!(result.unwrap_err().status(), Some(Status::Empty));
        assert_eq!(emd.status(), Status::Empty);
        assert_eq!(emd.raw(), 0.);
    }

    #[test]
    fn one_empty_event_routes_everything_through_the_extra() {
        let config = Config {
            r: 2.,
            ..Config::default()
        };
        let mut emd = EMD::<_, 2>::from((Euclidean, config));
        let lhs = Event::default();
        let rhs = Event::from(vec![(1., [0., 0.]), (2., [1., 1.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 6.));
        assert_eq!(emd.side(), Side::Lhs);
    }

    #[test]
    fn beta_amplifies_ground_distances() {
        let config = Config {
            beta: 2.,
            ..Config::default()
        };
        let mut emd = EMD::<_, 1>::from((Euclidean, config));
        let lhs = Event::from(vec![(1., [0.])]);
        let rhs = Event::from(vec![(1., [3.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 9.));
    }

    #[test]
    fn exposes_the_optimal_flows() {
        let config = Config {
            r: 5.,
            ..Config::default()
        };
        let mut emd = EMD::<_, 1>::from((Euclidean, config));
        let lhs = Event::from(vec![(2., [0.])]);
        let rhs = Event::from(vec![(1., [0.])]);
        emd.compute(&lhs, &rhs).unwrap();
        // one unit stays put, one unit exits through the extra column
        assert!(close(emd.flow(0, 0), 1.));
        assert!(close(emd.flow(0, 1), 1.));
    }

    #[test]
    fn splits_mass_between_two_targets() {
        let mut emd = EMD::<_, 1>::new(Euclidean);
        let lhs = Event::from(vec![(2., [0.])]);
        let rhs = Event::from(vec![(1., [-1.]), (1., [1.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 2.));
        assert!(close(emd.flow(0, 0), 1.));
        assert!(close(emd.flow(0, 1), 1.));
    }

    #[test]
    fn preprocessing_applies_to_both_events() {
        // identical shapes in different places look identical once centered
        let mut emd = EMD::<_, 2>::new(Euclidean).preprocess(Center);
        let lhs = Event::from(vec![(1., [0., 0.]), (1., [1., 0.])]);
        let rhs = Event::from(vec![(1., [5., 3.]), (1., [6., 3.])]);
        assert!(close(emd.compute(&lhs, &rhs).unwrap(), 0.));
    }

    #[test]
    fn computes_from_external_distances() {
        let externals = Externals::dense(2, 2, vec![0., 1., 1., 0.]).unwrap();
        let mut emd = EMD::<_, 0>::new(externals);
        let value = emd.compute_weighted(&[1., 1.], &[1., 1.]).unwrap();
        assert!(close(value, 0.));
        let value = emd.compute_weighted(&[2., 0.], &[0., 2.]).unwrap();
        assert!(close(value, 2.));
    }

    #[test]
    fn external_shape_mismatch_is_a_length_error() {
        let externals = Externals::dense(2, 2, vec![0., 1., 1., 0.]).unwrap();
        let mut emd = EMD::<_, 0>::new(externals);
        let result = emd.compute_weighted(&[1.], &[1., 1.]);
        assert!(matches!(result, Err(Error::Length { .. })));
    }

    #[test]
    fn timing_records_a_duration() {
        let config = Config {
            timing: true,
            ..Config::default()
        };
        let mut emd = EMD::<_, 1>::from((Euclidean, config));
        let lhs = Event::from(vec![(1., [0.])]);
        let rhs = Event::from(vec![(1., [1.])]);
        emd.compute(&lhs, &rhs).unwrap();
        assert!(emd.duration() > Duration::ZERO);
    }
}
