//! Pure logic for the command pipeline.
//!
//! Nothing in here spawns processes or touches the filesystem: classification,
//! retry scheduling, validation and the data model are all deterministic and
//! tested in isolation.

pub mod classifier;
pub mod error;
pub mod retry;
pub mod types;
pub mod validate;
