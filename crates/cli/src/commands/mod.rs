//! Command implementations.

mod run;
mod validate;

pub use run::run_recorder;
pub use validate::run_validate;
