//! External command execution.
//!
//! The command runs with the saved environment only; its stdout and stderr
//! are inherited so the application's output streams straight into the gear
//! log.

use crate::command::CommandSpec;
use log::{info, warn};
use std::collections::BTreeMap;
use std::process::{Command, ExitStatus};

/// Errors that can occur while running an external command
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} failed with {status}")]
    Failed { program: String, status: ExitStatus },
}

/// Run `command` with exactly the variables in `environment`.
///
/// In dry-run mode the command is logged and not run.
pub fn exec_command(
    command: &CommandSpec,
    environment: &BTreeMap<String, String>,
    dry_run: bool,
) -> Result<(), ExecError> {
    if dry_run {
        warn!("Dry run, not executing: {}", command);
        return Ok(());
    }

    info!("Executing command: {}", command);

    let status = Command::new(command.program())
        .args(command.args())
        .env_clear()
        .envs(environment)
        .status()
        .map_err(|source| ExecError::Launch {
            program: command.program().to_string(),
            source,
        })?;

    if !status.success() {
        return Err(ExecError::Failed {
            program: command.program().to_string(),
            status,
        });
    }

    info!("{} finished successfully", command.program());
    Ok(())
}
