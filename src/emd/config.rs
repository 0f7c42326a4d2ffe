use crate::Distance;

/// Cost policy for the extra particle that absorbs unmatched weight
/// when the two events carry different totals.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Extra {
    /// unmatched weight pays the maximum ground distance R^beta
    #[default]
    Cutoff,
    /// unmatched weight moves for free
    Free,
}

/// Knobs for a single emd computation. The pairwise driver layers its
/// own storage, threading, and failure settings on top of these.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// maximum ground distance, paid by unmatched weight under Cutoff
    pub r: Distance,
    /// exponent applied to every ground distance before it becomes an arc cost
    pub beta: Distance,
    /// divide the objective by the larger total weight
    pub norm: bool,
    /// cost policy for the balancing extra particle
    pub extra: Extra,
    /// record wall-clock duration of each solve
    pub timing: bool,
    /// pivot cap before the solver gives up
    pub n_iter_max: usize,
    /// tolerance scaling for balance and feasibility checks
    pub epsilon_large_factor: Distance,
    /// tolerance scaling for pricing comparisons
    pub epsilon_small_factor: Distance,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            r: 1.,
            beta: 1.,
            norm: false,
            extra: Extra::default(),
            timing: false,
            n_iter_max: 100_000,
            epsilon_large_factor: 1_000.,
            epsilon_small_factor: 1.,
        }
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "  R: {}", self.r)?;
        writeln!(f, "  beta: {}", self.beta)?;
        writeln!(f, "  norm: {}", self.norm)?;
        writeln!(f, "  extra: {:?}", self.extra)?;
        writeln!(f, "  n_iter_max: {}", self.n_iter_max)?;
        writeln!(f, "  epsilon_large_factor: {}", self.epsilon_large_factor)?;
        writeln!(f, "  epsilon_small_factor: {}", self.epsilon_small_factor)
    }
}
