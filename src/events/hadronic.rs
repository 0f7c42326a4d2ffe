use super::measure::Measure;
use super::particle::Particle;
use crate::Coord;
use crate::Distance;
use std::f64::consts::PI;
use std::f64::consts::TAU;

/// Distance on the rapidity-azimuth cylinder of hadron collider events:
/// straight in rapidity, periodic in azimuth.
#[derive(Debug, Default, Clone, Copy)]
pub struct Hadronic;

impl Hadronic {
    /// wrap an azimuthal difference into [-pi, pi]
    fn wrap(dphi: Coord) -> Coord {
        let mut d = dphi % TAU;
        if d > PI {
            d -= TAU;
        }
        if d < -PI {
            d += TAU;
        }
        d
    }
}

impl Measure<2> for Hadronic {
    fn distance(&self, x: &Particle<2>, y: &Particle<2>) -> Distance {
        let dy = x.coords()[0] - y.coords()[0];
        let dphi = Self::wrap(x.coords()[1] - y.coords()[1]);
        (dy * dy + dphi * dphi).sqrt()
    }
}
