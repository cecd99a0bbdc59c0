pub mod clock;
pub mod rng;
pub mod store;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use rng::{Lcg, RandomSource};
pub use store::NvStore;
