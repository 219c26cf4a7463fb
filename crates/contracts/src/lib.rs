//! # Contracts
//!
//! Frozen interface contracts shared by every bulkmt crate: commands, rendered
//! bulks, the subscriber capability and the configuration blueprint.
//! Business crates depend on this crate, never the other way around.
//!
//! ## Rendering
//! A bulk renders as `"bulk: "` followed by its commands joined with `", "`.

mod blueprint;
mod bulk;
mod command;
mod error;
mod sink;

pub use blueprint::*;
pub use bulk::*;
pub use command::*;
pub use error::*;
pub use sink::*;
