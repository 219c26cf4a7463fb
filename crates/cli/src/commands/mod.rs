//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::{RunOutcome, input_interrupted, run_pipeline};
pub use validate::run_validate;
