//! # Contracts
//!
//! Frozen interface contracts, defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Tick Model
//! - The external frame loop drives everything once per simulation tick
//! - Agent snapshots are produced fresh each tick and never mutated

mod agent;
mod blueprint;
mod error;
mod frame;
mod policy;
mod recording;
mod resolution;
mod store;

pub use agent::*;
pub use blueprint::*;
pub use error::*;
pub use frame::*;
pub use policy::*;
pub use recording::*;
pub use resolution::*;
pub use store::*;
