//! Process execution module.
//!
//! This module loads the environment the wrapped application expects and
//! runs external commands (the application itself, `bids-validator`).

pub mod environment;
pub mod exec;
pub mod types;

// Re-export commonly used items for convenience
pub use environment::load_environment;
pub use exec::{exec_command, ExecError};
pub use types::AnalysisLevel;
