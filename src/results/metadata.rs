//! Run metadata: image quality metrics (IQMs) harvested from the output.
//!
//! The application writes one JSON file of IQMs per scan under
//! `sub-*/[ses-*/]<datatype>/`. They are gathered into
//! `{"analysis": {"info": {"<file stem>": {...}}}}` and saved as
//! `.metadata.json` in the output directory.

use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info, warn};
use regex::Regex;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Name of the metadata file in the output directory
pub const METADATA_FILE: &str = ".metadata.json";

/// Per-scan IQM files written by the application
static IQM_FILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sub-[^/]+\.json$").expect("Invalid IQM file regex"));

/// Collect the IQM JSON files under `analysis_dir` into metadata.
///
/// Returns `None` when no IQM file was found.
pub fn store_iqms(analysis_dir: &Path) -> Option<Value> {
    let mut files = Vec::new();
    find_iqm_files(analysis_dir, false, &mut files);
    files.sort();

    let mut info_map = Map::new();
    for path in &files {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match fs::read_to_string(path).map(|text| serde_json::from_str::<Value>(&text)) {
            Ok(Ok(iqms)) => {
                debug!("Adding IQMs from {:?}", path);
                info_map.insert(stem.to_string(), iqms);
            }
            Ok(Err(e)) => warn!("Skipping unparsable IQM file {:?}: {}", path, e),
            Err(e) => warn!("Cannot read IQM file {:?}: {}", path, e),
        }
    }

    if info_map.is_empty() {
        info!("Missing info for metadata. Checked here: {}", analysis_dir.display());
        return None;
    }

    info!("Found IQMs for {} scans", info_map.len());
    Some(json!({ "analysis": { "info": info_map } }))
}

/// Walk `dir`; only files inside a `sub-*` tree are considered
fn find_iqm_files(dir: &Path, in_subject: bool, files: &mut Vec<PathBuf>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if path.is_dir() {
            if in_subject || name.starts_with("sub-") {
                find_iqm_files(&path, true, files);
            }
        } else if in_subject && IQM_FILE.is_match(&name) {
            files.push(path);
        }
    }
}

/// Metadata recorded for a dry run
pub fn dry_run_metadata() -> Value {
    json!({
        "analysis": {
            "info": {
                "dry_run": { "How dry I am": "Say to Mister Temperance...." }
            }
        }
    })
}

/// True when the metadata carries a non-empty `analysis.info`
pub fn has_analysis_info(metadata: &Value) -> bool {
    metadata
        .pointer("/analysis/info")
        .and_then(Value::as_object)
        .map_or(false, |info| !info.is_empty())
}

/// Write `.metadata.json` when there is analysis info to save.
///
/// Returns the path written, if any.
pub fn write_metadata(output_dir: &Path, metadata: &Value) -> Result<Option<PathBuf>> {
    debug!(
        ".metadata.json: {}",
        serde_json::to_string_pretty(metadata).unwrap_or_default()
    );

    if !has_analysis_info(metadata) {
        info!("No data available to save in .metadata.json.");
        return Ok(None);
    }

    let path = output_dir.join(METADATA_FILE);
    let content = serde_json::to_string(metadata)?;
    fs::write(&path, content).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    info!("Wrote {}", path.display());
    Ok(Some(path))
}
