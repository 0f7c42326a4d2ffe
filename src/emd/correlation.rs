use super::handler::Handler;
use super::histogram::Histogram;
use crate::Distance;

/// Correlation dimension estimator.
///
/// Accumulates pairwise distances into log-spaced bins and reads the
/// dimension off as the local slope of ln(pairs closer than a scale)
/// against ln(scale). The observed collection looks d-dimensional at
/// the scales where the slope plateaus at d.
pub struct Correlation {
    hist: Histogram,
}

impl Correlation {
    /// log-spaced scales between lo and hi; bounds must be positive
    pub fn new(nbins: usize, lo: Distance, hi: Distance) -> Self {
        Self {
            hist: Histogram::log(nbins, lo, hi),
        }
    }

    /// everything observed so far
    pub fn total(&self) -> f64 {
        self.hist.total()
    }

    /// the probed scales, one per bin edge
    pub fn edges(&self) -> Vec<Distance> {
        self.hist.edges()
    }

    /// pairs observed below each bin edge, underflow included
    pub fn cumulative(&self) -> Vec<f64> {
        let counts = self.hist.counts();
        let mut below = self.hist.underflow();
        let mut cumulative = vec![below];
        for count in counts {
            below += count;
            cumulative.push(below);
        }
        cumulative
    }

    /// (scale, slope) samples between adjacent edges; edges whose
    /// cumulative count is still zero contribute nothing
    pub fn dims(&self) -> Vec<(Distance, Distance)> {
        let edges = self.edges();
        let cumulative = self.cumulative();
        edges
            .windows(2)
            .zip(cumulative.windows(2))
            .filter(|(_, c)| c[0] > 0. && c[1] > 0.)
            .map(|(e, c)| {
                let scale = (e[0] * e[1]).sqrt();
                let slope = (c[1].ln() - c[0].ln()) / (e[1].ln() - e[0].ln());
                (scale, slope)
            })
            .collect()
    }
}

impl Handler for Correlation {
    fn observe(&self, emd: Distance) {
        self.hist.observe(emd);
    }
}
