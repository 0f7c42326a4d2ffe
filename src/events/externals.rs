use crate::emd::rank;
use crate::emd::Error;
use crate::Distance;

/// Caller-supplied ground distances for when particles never existed:
/// either a dense rows-by-cols matrix, or the strict lower triangle of
/// a symmetric square one, flattened in the pairwise rank order.
///
/// Typical use is chaining sweeps, where the pairwise distances from one
/// sweep become the ground distances of a coarser problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Externals {
    rows: usize,
    cols: usize,
    dists: Vec<Distance>,
    triangular: bool,
}

impl Externals {
    /// dense row-major matrix of rows x cols entries
    pub fn dense(rows: usize, cols: usize, dists: Vec<Distance>) -> Result<Self, Error> {
        match dists.len() == rows * cols {
            false => Err(Error::Length {
                expected: rows * cols,
                actual: dists.len(),
            }),
            true => Ok(Self {
                rows,
                cols,
                dists,
                triangular: false,
            }),
        }
    }

    /// symmetric matrix over one collection of n items, given by its
    /// n(n-1)/2 independent entries in pairwise rank order
    pub fn triangular(n: usize, dists: Vec<Distance>) -> Result<Self, Error> {
        let expected = n * n.saturating_sub(1) / 2;
        match dists.len() == expected {
            false => Err(Error::Length {
                expected,
                actual: dists.len(),
            }),
            true => Ok(Self {
                rows: n,
                cols: n,
                dists,
                triangular: true,
            }),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// ground distance between row item i and column item j
    pub fn at(&self, i: usize, j: usize) -> Distance {
        match self.triangular {
            false => self.dists[i * self.cols + j],
            true => match i.cmp(&j) {
                std::cmp::Ordering::Equal => 0.,
                std::cmp::Ordering::Less => self.dists[rank(j, i)],
                std::cmp::Ordering::Greater => self.dists[rank(i, j)],
            },
        }
    }
}
