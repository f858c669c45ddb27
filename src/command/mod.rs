//! Command construction module.
//!
//! Turns the filtered gear configuration into the argv handed to the
//! wrapped application. Pure and free of I/O.

pub mod builder;
pub mod types;

pub use builder::{build, split_passthrough, CommandError, CommandSpec};
pub use types::{ParameterMap, ParameterValue};
