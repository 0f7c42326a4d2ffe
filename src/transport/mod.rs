mod simplex;
mod status;

pub use simplex::*;
pub use status::*;
