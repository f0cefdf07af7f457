mod latency;
mod timer;

pub use latency::LatencyStats;
pub use timer::{Clock, HighPrecisionTimer, ManualClock};
