mod config;
mod correlation;
mod error;
mod exact;
mod handler;
mod histogram;
mod pairwise;
mod progress;
mod storage;

pub use config::*;
pub use correlation::*;
pub use error::*;
pub use exact::*;
pub use handler::*;
pub use histogram::*;
pub use pairwise::*;
pub use progress::*;
pub use storage::*;

#[cfg(test)]
mod tests;
