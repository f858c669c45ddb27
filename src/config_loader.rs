use crate::command::{split_passthrough, ParameterMap};
use crate::config::{
    parameter_value, GearConfig, Manifest, ValidationError, PASSTHROUGH_KEY, RESERVED_PREFIX,
};
use crate::utils::options::merge_options;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use serde_json::{Map, Value};
use std::fs::File;
use std::path::Path;

/// Load the run configuration from a JSON or YAML file, overlay it on the
/// manifest defaults and validate the result
pub fn load_config(config_path: &Path, manifest: Option<&Manifest>) -> Result<GearConfig> {
    let mut config = read_config(config_path)?;
    apply_manifest_defaults(&mut config, manifest);
    config.validate()?;

    Ok(config)
}

/// Parse the run configuration without defaults or validation
pub fn read_config(config_path: &Path) -> Result<GearConfig> {
    let file = File::open(config_path)
        .wrap_err_with(|| format!("Failed to open configuration '{}'", config_path.display()))?;

    let config: GearConfig = if is_yaml(config_path) {
        serde_yaml::from_reader(file).wrap_err_with(|| {
            format!("Failed to parse YAML configuration '{}'", config_path.display())
        })?
    } else {
        serde_json::from_reader(file).wrap_err_with(|| {
            format!("Failed to parse JSON configuration '{}'", config_path.display())
        })?
    };

    Ok(config)
}

fn is_yaml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml")
        })
}

/// Load the gear manifest. A missing manifest is not an error.
///
/// Runs before logging is configured, so nothing is logged here.
pub fn load_manifest(manifest_path: &Path) -> Result<Option<Manifest>> {
    if !manifest_path.exists() {
        return Ok(None);
    }

    let file = File::open(manifest_path)
        .wrap_err_with(|| format!("Failed to open manifest '{}'", manifest_path.display()))?;
    let manifest: Manifest = serde_json::from_reader(file)
        .wrap_err_with(|| format!("Failed to parse manifest '{}'", manifest_path.display()))?;

    Ok(Some(manifest))
}

/// Overlay the run configuration on the manifest defaults
pub fn apply_manifest_defaults(config: &mut GearConfig, manifest: Option<&Manifest>) {
    let Some(manifest) = manifest else {
        return;
    };
    let defaults = manifest.defaults();
    let merged = merge_options(Some(&defaults), Some(&config.config));
    for key in merged.keys().filter(|k| !config.config.contains_key(*k)) {
        debug!("Using manifest default for '{}'", key);
    }
    config.config = merged;
}

/// Log the effective configuration, one option per line
pub fn log_config(config: &GearConfig) {
    info!("Destination: {}", config.destination.id);
    for (key, value) in &config.config {
        info!("  {}: {}", key, value);
    }
}

/// Application parameters split out of the run configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandParameters {
    /// Options translated into flags, in configuration order
    pub parameters: ParameterMap,
    /// Raw tokens from `bids_app_args`
    pub passthrough: Vec<String>,
}

/// Extract the application parameters.
///
/// Reserved `gear-` keys are dropped, `bids_app_args` is split into
/// passthrough tokens and `null` options are skipped.
pub fn extract_parameters(
    config: &Map<String, Value>,
) -> Result<CommandParameters, ValidationError> {
    let mut extracted = CommandParameters::default();

    for (key, value) in config {
        if key == PASSTHROUGH_KEY {
            let raw = value.as_str().ok_or_else(|| {
                ValidationError::InvalidParameter(format!("{} must be a string", PASSTHROUGH_KEY))
            })?;
            extracted.passthrough.extend(split_passthrough(raw));
        } else if key.starts_with(RESERVED_PREFIX) {
            continue;
        } else if let Some(parameter) = parameter_value(key, value)? {
            extracted.parameters.insert(key.clone(), parameter);
        } else {
            debug!("Skipping unset option '{}'", key);
        }
    }

    Ok(extracted)
}
