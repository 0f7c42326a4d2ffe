/// Outcome of a network simplex solve.
///
/// `Success` is the only outcome whose objective can be trusted.
/// Everything else tells the caller why the numbers are meaningless,
/// and `hint` suggests the knob to turn when one exists.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// optimal flow found, objective and flows are valid
    Success,
    /// both sides carry zero total weight, nothing to transport
    #[default]
    Empty,
    /// supply and demand totals disagree beyond tolerance
    SupplyMismatch,
    /// the objective can decrease without bound
    Unbounded,
    /// pivot cap hit before reaching optimality
    MaxIterReached,
    /// an artificial arc still carries flow at optimality
    Infeasible,
}

impl Status {
    /// remediation hint for the failures that have one
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::SupplyMismatch => Some("consider increasing epsilon_large_factor"),
            Self::MaxIterReached => Some("consider increasing n_iter_max"),
            _ => None,
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "Success"),
            Self::Empty => write!(f, "Empty"),
            Self::SupplyMismatch => write!(f, "SupplyMismatch"),
            Self::Unbounded => write!(f, "Unbounded"),
            Self::MaxIterReached => write!(f, "MaxIterReached"),
            Self::Infeasible => write!(f, "Infeasible"),
        }
    }
}
