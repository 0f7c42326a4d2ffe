mod center;
mod euclidean;
mod event;
mod externals;
mod hadronic;
mod measure;
mod particle;
mod source;

pub use center::*;
pub use euclidean::*;
pub use event::*;
pub use externals::*;
pub use hadronic::*;
pub use measure::*;
pub use particle::*;
pub use source::*;
