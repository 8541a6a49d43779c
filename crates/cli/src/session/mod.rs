//! Recording session: MockWorld driven through the FrameLoop

mod runner;
mod stats;

pub use runner::{Session, SessionConfig};
pub use stats::SessionStats;
