//! Round and session cadence metrics

mod aggregate;
mod round;

pub use aggregate::{SessionAggregate, Summary};
pub use round::RoundMetrics;
