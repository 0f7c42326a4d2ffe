/// Memory layout for pairwise results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    /// dense n x n matrix with both mirror entries written; the only
    /// layout two-collection sweeps support
    Full,
    /// dense n x n matrix, one triangle computed and mirrored
    FullSymmetric,
    /// only the n(n-1)/2 independent values, in rank order
    #[default]
    FlattenedSymmetric,
    /// nothing retained; every value streams to the registered handler
    External,
}

impl Storage {
    /// slots to allocate for an n-event symmetric sweep
    pub fn slots(&self, n: usize) -> usize {
        match self {
            Self::Full | Self::FullSymmetric => n * n,
            Self::FlattenedSymmetric => n * n.saturating_sub(1) / 2,
            Self::External => 0,
        }
    }
}

/// canonical rank of the unordered pair {i, j} with i > j, counting
/// the strict lower triangle row by row
pub fn rank(i: usize, j: usize) -> usize {
    debug_assert!(i > j, "rank wants i > j");
    i * (i - 1) / 2 + j
}

/// inverse of rank: the unordered pair {i, j} with i > j at position k.
/// the float root is only a guess; the loops pin it down exactly.
pub fn unrank(k: usize) -> (usize, usize) {
    let mut i = (((8 * k + 1) as f64).sqrt() as usize + 1) / 2;
    while i * i.saturating_sub(1) / 2 > k {
        i -= 1;
    }
    while (i + 1) * i / 2 <= k {
        i += 1;
    }
    (i, k - i * (i - 1) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_counts_the_lower_triangle() {
        assert_eq!(rank(1, 0), 0);
        assert_eq!(rank(2, 0), 1);
        assert_eq!(rank(2, 1), 2);
        assert_eq!(rank(3, 0), 3);
    }

    #[test]
    fn unrank_inverts_rank() {
        for k in 0..1_000 {
            let (i, j) = unrank(k);
            assert!(i > j);
            assert_eq!(rank(i, j), k);
        }
    }

    #[test]
    fn slots_match_layouts() {
        assert_eq!(Storage::Full.slots(4), 16);
        assert_eq!(Storage::FullSymmetric.slots(4), 16);
        assert_eq!(Storage::FlattenedSymmetric.slots(4), 6);
        assert_eq!(Storage::FlattenedSymmetric.slots(0), 0);
        assert_eq!(Storage::External.slots(4), 0);
    }
}
