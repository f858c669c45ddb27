//! Error and warning accumulation for a gear run.
//!
//! Problems are collected as they happen and repeated at the end of the log
//! so they are easy to find after a long application run.

use log::info;
use std::fmt::Write;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Multi-line summary, empty when nothing was recorded
    pub fn summary(&self) -> String {
        let mut msg = String::new();
        if !self.warnings.is_empty() {
            msg.push_str("Previous warnings:\n");
            for warning in &self.warnings {
                let _ = writeln!(msg, "  Warning: {}", warning);
            }
        }
        if !self.errors.is_empty() {
            msg.push_str("Previous errors:\n");
            for error in &self.errors {
                let _ = writeln!(msg, "  Error msg: {}", error);
            }
        }
        msg
    }

    pub fn log_summary(&self) {
        let summary = self.summary();
        if !summary.is_empty() {
            info!("{}", summary.trim_end());
        }
    }

    /// Process exit code: 1 if any error was recorded
    pub fn exit_code(&self) -> i32 {
        if self.has_errors() {
            1
        } else {
            0
        }
    }
}
