//! Test-support utilities that are also used by production code paths
//! (the clock abstraction ships in release builds; `MockClock` is only
//! ever constructed from tests).

pub mod time;

pub use time::{Clock, MockClock, SystemClock};
