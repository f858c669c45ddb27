//! Execution environment for the wrapped application.
//!
//! The container build saves its shell environment as a JSON object so the
//! application runs with the same variables it was installed with.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, warn};
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

/// Default location of the saved environment
pub const ENVIRONMENT_FILE: &str = "/tmp/gear_environ.json";

/// Load the saved environment.
///
/// Falls back to the environment of the current process when the file does
/// not exist.
pub fn load_environment(path: &Path) -> Result<BTreeMap<String, String>> {
    let environ: BTreeMap<String, String> = if path.exists() {
        let file = File::open(path)
            .wrap_err_with(|| format!("Failed to open environment file '{}'", path.display()))?;
        serde_json::from_reader(file)
            .wrap_err_with(|| format!("Failed to parse environment file '{}'", path.display()))?
    } else {
        warn!("Environment file {:?} not found, using current environment", path);
        std::env::vars().collect()
    };

    let kv: Vec<String> = environ.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    debug!("Environment: {}", kv.join(" "));

    Ok(environ)
}
