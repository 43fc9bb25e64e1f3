//! inferix math utilities.

pub mod distribution;
pub mod math;
pub mod optim;

pub use distribution::{Distribution, DistributionTag, MathError, Support};
pub use math::special::*;
pub use math::stable::*;
pub use optim::Adam;
