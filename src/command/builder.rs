//! Command-line construction from a parameter map.
//!
//! Translation rules, applied per parameter in map order:
//! - one-character name -> `-k` followed by `value` when the value is non-empty
//!   (booleans included, so `-x true`)
//! - `Bool(true)` -> `--flag`, `Bool(false)` -> (omitted)
//! - empty value -> `--flag`
//! - multi-value, or a string holding whitespace -> `--flag v1 v2 ...`
//! - anything else -> `--flag=value`
//!
//! `verbose` is then rewritten as a count flag (`vvv` -> `-vvv`).

use super::types::{ParameterMap, ParameterValue};
use std::fmt;

/// Parameter rewritten from `--verbose=vvv` into `-vvv`
const VERBOSE_KEY: &str = "verbose";

/// Errors raised when the builder is called with malformed input
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Contract violation: {0}")]
    ContractViolation(String),
}

/// Ordered argv-style tokens, program name first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    tokens: Vec<String>,
}

impl CommandSpec {
    pub fn program(&self) -> &str {
        &self.tokens[0]
    }

    pub fn args(&self) -> &[String] {
        &self.tokens[1..]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.tokens
    }
}

/// Space-joined form for logging. Tokens are not shell-escaped.
impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

/// Split a raw passthrough string (e.g. `bids_app_args`) into tokens
pub fn split_passthrough(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(String::from).collect()
}

/// Build the command for `program`.
///
/// Tokens are laid out as program, positional arguments, passthrough
/// arguments, then one group per parameter in map order. The builder does
/// no shell escaping and never checks whether the target application
/// understands the generated flags.
///
/// # Errors
/// `CommandError::ContractViolation` if `program` or any parameter name is
/// empty.
///
/// # Examples
/// ```
/// use mriqc_gear::command::{build, ParameterMap, ParameterValue};
///
/// let mut params = ParameterMap::new();
/// params.insert("verbose", ParameterValue::from("vv"));
/// params.insert("n_cpus", ParameterValue::from(4u64));
///
/// let cmd = build("mriqc", &["/bids".to_string()], &params, &[]).unwrap();
/// assert_eq!(cmd.tokens(), ["mriqc", "/bids", "-vv", "--n_cpus=4"]);
/// ```
pub fn build(
    program: &str,
    positional: &[String],
    parameters: &ParameterMap,
    passthrough: &[String],
) -> Result<CommandSpec, CommandError> {
    if program.is_empty() {
        return Err(CommandError::ContractViolation(
            "program name cannot be empty".to_string(),
        ));
    }
    if parameters.keys().any(str::is_empty) {
        return Err(CommandError::ContractViolation(
            "parameter name cannot be empty".to_string(),
        ));
    }

    let capacity = 1 + positional.len() + passthrough.len() + parameters.len();
    let mut tokens = Vec::with_capacity(capacity);
    tokens.push(program.to_string());
    tokens.extend(positional.iter().cloned());
    tokens.extend(passthrough.iter().cloned());

    for (key, value) in parameters.iter() {
        let emitted_from = tokens.len();
        emit_parameter(&mut tokens, key, value);
        if key == VERBOSE_KEY {
            rewrite_verbose_count(&mut tokens, emitted_from, value);
        }
    }

    Ok(CommandSpec { tokens })
}

fn emit_parameter(tokens: &mut Vec<String>, key: &str, value: &ParameterValue) {
    if key.chars().count() == 1 {
        tokens.push(format!("-{}", key));
        let text = value.to_string();
        if !text.is_empty() {
            tokens.push(text);
        }
        return;
    }

    match value {
        ParameterValue::Bool(true) => tokens.push(format!("--{}", key)),
        ParameterValue::Bool(false) => {}
        ParameterValue::MultiValue(items) if !items.is_empty() => {
            tokens.push(format!("--{}", key));
            tokens.extend(items.iter().cloned());
        }
        other => {
            let text = other.to_string();
            let pieces: Vec<&str> = text.split_whitespace().collect();
            if text.is_empty() {
                tokens.push(format!("--{}", key));
            } else if pieces.len() > 1 {
                tokens.push(format!("--{}", key));
                tokens.extend(pieces.into_iter().map(String::from));
            } else {
                tokens.push(format!("--{}={}", key, text));
            }
        }
    }
}

/// Replace whatever was emitted for `verbose` with a single `-{value}`.
/// Nothing is emitted when the generic pass emitted nothing (false).
fn rewrite_verbose_count(tokens: &mut Vec<String>, emitted_from: usize, value: &ParameterValue) {
    if tokens.len() == emitted_from {
        return;
    }
    tokens.truncate(emitted_from);
    let count = match value {
        ParameterValue::Bool(true) => "v".to_string(),
        other => other.to_string(),
    };
    tokens.push(format!("-{}", count));
}
