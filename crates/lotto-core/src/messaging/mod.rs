//! Chat-platform abstractions and the delivery engine built on them.

pub mod dispatch;
pub mod port;
pub mod throttled;
pub mod types;
