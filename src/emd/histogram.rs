use super::handler::Handler;
use crate::Distance;
use std::sync::Mutex;

/// Axis transform applied before binning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Linear,
    Log,
}

/// Streaming fixed-range histogram with underflow and overflow bins,
/// safe to fill from many workers at once. Counts are f64 so a later
/// weighting scheme never changes the interface.
pub struct Histogram {
    axis: Axis,
    nbins: usize,
    lo: Distance,
    hi: Distance,
    counts: Mutex<Vec<f64>>,
}

impl Histogram {
    /// evenly spaced bins between lo and hi
    pub fn new(nbins: usize, lo: Distance, hi: Distance) -> Self {
        assert!(nbins > 0, "histogram needs at least one bin");
        assert!(lo < hi, "histogram range must be increasing");
        Self {
            axis: Axis::Linear,
            nbins,
            lo,
            hi,
            counts: Mutex::new(vec![0.; nbins + 2]),
        }
    }

    /// log-spaced bins between lo and hi; bounds must be positive
    pub fn log(nbins: usize, lo: Distance, hi: Distance) -> Self {
        assert!(nbins > 0, "histogram needs at least one bin");
        assert!(0. < lo && lo < hi, "log axis needs positive increasing bounds");
        Self {
            axis: Axis::Log,
            nbins,
            lo: lo.ln(),
            hi: hi.ln(),
            counts: Mutex::new(vec![0.; nbins + 2]),
        }
    }

    /// slot index for a value: 0 is underflow, nbins + 1 overflow
    fn bin(&self, value: Distance) -> usize {
        let t = match self.axis {
            Axis::Linear => value,
            Axis::Log => value.ln(),
        };
        if t < self.lo {
            0
        } else if t >= self.hi {
            self.nbins + 1
        } else {
            let k = ((t - self.lo) / (self.hi - self.lo) * self.nbins as f64) as usize;
            1 + k.min(self.nbins - 1)
        }
    }

    /// interior bin contents, underflow and overflow excluded
    pub fn counts(&self) -> Vec<f64> {
        let counts = self.counts.lock().expect("histogram lock");
        counts[1..=self.nbins].to_vec()
    }

    pub fn underflow(&self) -> f64 {
        self.counts.lock().expect("histogram lock")[0]
    }

    pub fn overflow(&self) -> f64 {
        let counts = self.counts.lock().expect("histogram lock");
        counts[self.nbins + 1]
    }

    /// everything observed so far, spills included
    pub fn total(&self) -> f64 {
        self.counts.lock().expect("histogram lock").iter().sum()
    }

    /// the nbins + 1 bin edges on the original axis
    pub fn edges(&self) -> Vec<Distance> {
        (0..=self.nbins)
            .map(|k| self.lo + (self.hi - self.lo) * k as f64 / self.nbins as f64)
            .map(|edge| match self.axis {
                Axis::Linear => edge,
                Axis::Log => edge.exp(),
            })
            .collect()
    }
}

impl Handler for Histogram {
    fn observe(&self, emd: Distance) {
        let bin = self.bin(emd);
        self.counts.lock().expect("histogram lock")[bin] += 1.;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bins_interior_values() {
        let hist = Histogram::new(4, 0., 1.);
        hist.observe(0.1);
        hist.observe(0.3);
        hist.observe(0.55);
        hist.observe(0.9);
        assert_eq!(hist.counts(), vec![1., 1., 1., 1.]);
        assert_eq!(hist.total(), 4.);
    }

    #[test]
    fn spills_out_of_range_values() {
        let hist = Histogram::new(2, 0., 1.);
        hist.observe(-0.5);
        hist.observe(1.);
        hist.observe(7.);
        assert_eq!(hist.underflow(), 1.);
        assert_eq!(hist.overflow(), 2.);
        assert_eq!(hist.counts(), vec![0., 0.]);
    }

    #[test]
    fn tolerates_concurrent_fills() {
        let hist = Histogram::new(4, 0., 1.);
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for k in 0..100 {
                        hist.observe(k as f64 / 100.);
                    }
                });
            }
        });
        assert_eq!(hist.total(), 400.);
        assert_eq!(hist.counts().iter().sum::<f64>(), 400.);
    }

    #[test]
    fn log_axis_spaces_edges_geometrically() {
        let hist = Histogram::log(3, 1., 1000.);
        let edges = hist.edges();
        assert!((edges[0] - 1.).abs() < 1e-9);
        assert!((edges[1] - 10.).abs() < 1e-9);
        assert!((edges[2] - 100.).abs() < 1e-9);
        assert!((edges[3] - 1000.).abs() < 1e-9);
        hist.observe(5.);
        hist.observe(50.);
        hist.observe(49.);
        assert_eq!(hist.counts(), vec![1., 2., 0.]);
    }
}
