use crate::command::ParameterValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of gear-internal settings that are never passed to the application
pub const RESERVED_PREFIX: &str = "gear-";

/// Configuration key whose value is appended to the command verbatim
pub const PASSTHROUGH_KEY: &str = "bids_app_args";

/// Run configuration for one gear invocation (`config.json`)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GearConfig {
    /// Gear and application options, in manifest order
    #[serde(default)]
    pub config: Map<String, Value>,
    /// File inputs attached to the job
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub inputs: Map<String, Value>,
    /// Container receiving the results
    pub destination: Destination,
}

impl GearConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.destination.id.trim().is_empty() {
            return Err(ValidationError::InvalidDestination(
                "destination id cannot be empty".to_string(),
            ));
        }

        if self.config.keys().any(|k| k.is_empty()) {
            return Err(ValidationError::InvalidParameter(
                "configuration keys cannot be empty".to_string(),
            ));
        }

        if let Some(value) = self.config.get(PASSTHROUGH_KEY) {
            if !value.is_string() {
                return Err(ValidationError::InvalidParameter(format!(
                    "{} must be a string, got {}",
                    PASSTHROUGH_KEY, value
                )));
            }
        }

        for (key, value) in &self.config {
            if !key.starts_with(RESERVED_PREFIX) {
                parameter_value(key, value)?;
            }
        }

        Ok(())
    }

    /// Gear-internal settings read from the reserved keys
    pub fn gear_options(&self) -> GearOptions {
        GearOptions {
            log_level: match self.config.get("gear-log-level").and_then(Value::as_str) {
                Some("INFO") | None => LogLevel::Info,
                Some(_) => LogLevel::Debug,
            },
            dry_run: flag(&self.config, "gear-dry-run"),
            run_bids_validation: flag(&self.config, "gear-run-bids-validation"),
            ignore_bids_errors: flag(&self.config, "gear-ignore-bids-errors"),
            save_intermediate_output: flag(&self.config, "gear-save-intermediate-output"),
            intermediate_files: words(&self.config, "gear-intermediate-files"),
            intermediate_folders: words(&self.config, "gear-intermediate-folders"),
            keep_output: flag(&self.config, "gear-keep-output"),
        }
    }
}

fn flag(config: &Map<String, Value>, key: &str) -> bool {
    config.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn words(config: &Map<String, Value>, key: &str) -> Vec<String> {
    config
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.split_whitespace().map(String::from).collect())
        .unwrap_or_default()
}

/// Destination container of the analysis
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Destination {
    pub id: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub container_type: Option<String>,
}

/// Gear manifest (`manifest.json`); only the parts the gear reads
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Manifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Option declarations, each possibly carrying a `default`
    #[serde(default)]
    pub config: Map<String, Value>,
}

impl Manifest {
    /// Declared defaults, in manifest order
    pub fn defaults(&self) -> Map<String, Value> {
        self.config
            .iter()
            .filter_map(|(key, spec)| spec.get("default").map(|d| (key.clone(), d.clone())))
            .collect()
    }
}

/// Logging verbosity requested by `gear-log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
}

impl LogLevel {
    /// Filter string understood by env_logger
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }
}

/// Settings taken from the `gear-` keys
#[derive(Debug, Clone, PartialEq)]
pub struct GearOptions {
    pub log_level: LogLevel,
    pub dry_run: bool,
    pub run_bids_validation: bool,
    pub ignore_bids_errors: bool,
    pub save_intermediate_output: bool,
    pub intermediate_files: Vec<String>,
    pub intermediate_folders: Vec<String>,
    pub keep_output: bool,
}

/// Convert a configuration value into a command parameter.
///
/// Returns `Ok(None)` for `null`, which means the option is unset.
/// Arrays become explicit multi-values; objects are rejected.
pub fn parameter_value(
    key: &str,
    value: &Value,
) -> Result<Option<ParameterValue>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(b) => Ok(Some(ParameterValue::Bool(*b))),
        Value::Number(n) => Ok(Some(ParameterValue::Number(n.clone()))),
        Value::String(s) => Ok(Some(ParameterValue::from_text(s))),
        Value::Array(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) => values.push(s.clone()),
                    Value::Number(n) => values.push(n.to_string()),
                    Value::Bool(b) => values.push(b.to_string()),
                    other => {
                        return Err(ValidationError::InvalidParameter(format!(
                            "'{}' has an unsupported list item: {}",
                            key, other
                        )))
                    }
                }
            }
            Ok(Some(ParameterValue::MultiValue(values)))
        }
        Value::Object(_) => Err(ValidationError::InvalidParameter(format!(
            "'{}' cannot be an object",
            key
        ))),
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}
