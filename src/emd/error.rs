use crate::transport::Status;

/// Failures surfaced at the crate boundary. The solver itself speaks
/// Status; by the time anything reaches here it is already a hard error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// a solve finished with a non-Success status, for the given pair
    /// when it happened inside a sweep
    Solver {
        status: Status,
        pair: Option<(usize, usize)>,
    },
    /// a supplied distance array does not match the declared shape
    Length { expected: usize, actual: usize },
    /// a driver configuration that cannot produce a valid sweep
    Mode(&'static str),
}

impl Error {
    /// attach the pair a sweep was working on when the solve failed
    pub fn at(self, i: usize, j: usize) -> Self {
        match self {
            Self::Solver { status, .. } => Self::Solver {
                status,
                pair: Some((i, j)),
            },
            other => other,
        }
    }

    /// the solver status behind this error, if that is what it is
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Solver { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Solver { status, pair } => {
                match pair {
                    Some((i, j)) => write!(f, "solve failed on pair ({}, {}): {}", i, j, status)?,
                    None => write!(f, "solve failed: {}", status)?,
                }
                match status.hint() {
                    Some(hint) => write!(f, ", {}", hint),
                    None => Ok(()),
                }
            }
            Self::Length { expected, actual } => {
                write!(f, "expected {} distances, got {}", expected, actual)
            }
            Self::Mode(why) => write!(f, "invalid configuration: {}", why),
        }
    }
}

impl std::error::Error for Error {}
