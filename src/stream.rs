//! Stream combinators for state subscriptions.

mod throttle;

pub use throttle::{Throttle, ThrottleExt};
