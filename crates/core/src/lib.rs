pub mod clock;
pub mod random;

pub use clock::{Clock, ManualClock, SteadyClock};
pub use random::{DurationSampler, FixedSampler, ThreadRngSampler};
