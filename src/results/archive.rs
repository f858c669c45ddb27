//! Output packaging.
//!
//! Results are returned as zip archives built with the system `zip` tool:
//! the whole analysis directory, one archive per HTML report (renamed to
//! `index.html` so it can be viewed in place) and, on request, the work
//! directory or selected parts of it.

use log::{debug, info, warn};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Archiver executable
const ZIP_PROGRAM: &str = "zip";

/// Errors that can occur while creating archives
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("Creating {path} failed with {status}")]
    Failed { path: String, status: ExitStatus },

    #[error("Failed to prepare {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ArchiveError + '_ {
    move |source| ArchiveError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Zip `entries` (relative to `base_dir`) recursively into `zip_path`
pub fn zip_paths(
    base_dir: &Path,
    entries: &[PathBuf],
    zip_path: &Path,
) -> Result<(), ArchiveError> {
    let zip_path = if zip_path.is_absolute() {
        zip_path.to_path_buf()
    } else {
        std::env::current_dir().map_err(io_err(zip_path))?.join(zip_path)
    };

    debug!("Zipping {:?} from {:?} into {:?}", entries, base_dir, zip_path);
    let status = Command::new(ZIP_PROGRAM)
        .arg("-q")
        .arg("-r")
        .arg(&zip_path)
        .args(entries)
        .current_dir(base_dir)
        .status()
        .map_err(|source| ArchiveError::Launch {
            program: ZIP_PROGRAM.to_string(),
            source,
        })?;

    if !status.success() {
        return Err(ArchiveError::Failed {
            path: zip_path.display().to_string(),
            status,
        });
    }
    Ok(())
}

/// Zip `<output_dir>/<dir_name>` into `<output_dir>/<zip_name>`
pub fn zip_output(
    output_dir: &Path,
    dir_name: &str,
    zip_name: &str,
) -> Result<PathBuf, ArchiveError> {
    let zip_path = output_dir.join(zip_name);
    if !output_dir.join(dir_name).exists() {
        warn!("Nothing to zip: {:?} does not exist", output_dir.join(dir_name));
        return Ok(zip_path);
    }

    info!("Zipping output directory {} into {}", dir_name, zip_name);
    zip_paths(output_dir, &[PathBuf::from(dir_name)], &zip_path)?;
    Ok(zip_path)
}

/// Zip each `*.html` report at the top of `analysis_dir` into
/// `<output_dir>/<report>.html.zip`, stored as `index.html`
pub fn zip_htmls(output_dir: &Path, analysis_dir: &Path) -> Result<Vec<PathBuf>, ArchiveError> {
    let mut created = Vec::new();
    let Ok(entries) = fs::read_dir(analysis_dir) else {
        info!("No HTML reports: {:?} does not exist", analysis_dir);
        return Ok(created);
    };

    let mut reports: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().map_or(false, |ext| ext == "html"))
        .collect();
    reports.sort();

    for report in reports {
        let Some(file_name) = report.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let staging = output_dir.join(format!(".html_staging_{}", file_name));
        fs::create_dir_all(&staging).map_err(io_err(&staging))?;
        let index = staging.join("index.html");
        fs::copy(&report, &index).map_err(io_err(&report))?;

        let zip_path = output_dir.join(format!("{}.zip", file_name));
        let result = zip_paths(&staging, &[PathBuf::from("index.html")], &zip_path);
        fs::remove_dir_all(&staging).map_err(io_err(&staging))?;
        result?;

        info!("Zipped report {}", file_name);
        created.push(zip_path);
    }

    Ok(created)
}

/// Zip the whole work directory into `<output_dir>/<zip_name>`
pub fn zip_all_intermediate_output(
    work_dir: &Path,
    output_dir: &Path,
    zip_name: &str,
) -> Result<PathBuf, ArchiveError> {
    let zip_path = output_dir.join(zip_name);
    info!("Zipping all intermediate output into {}", zip_name);
    zip_paths(work_dir, &[PathBuf::from(".")], &zip_path)?;
    Ok(zip_path)
}

/// Result of zipping selected intermediate files and folders
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedArchive {
    pub zip_path: Option<PathBuf>,
    /// Requested names not found anywhere under the work directory
    pub missing: Vec<String>,
}

/// Zip intermediate files and folders whose names were requested.
///
/// Names are matched against every file (for `files`) or directory (for
/// `folders`) below `work_dir`.
pub fn zip_intermediate_selected(
    work_dir: &Path,
    output_dir: &Path,
    files: &[String],
    folders: &[String],
    zip_name: &str,
) -> Result<SelectedArchive, ArchiveError> {
    let mut outcome = SelectedArchive::default();
    if files.is_empty() && folders.is_empty() {
        return Ok(outcome);
    }

    let mut found = Vec::new();
    let mut seen = vec![false; files.len() + folders.len()];
    collect_selected(work_dir, Path::new(""), files, folders, &mut seen, &mut found);

    for (name, hit) in files.iter().chain(folders.iter()).zip(seen.iter()) {
        if !hit {
            warn!("Requested intermediate output '{}' not found", name);
            outcome.missing.push(name.clone());
        }
    }

    if found.is_empty() {
        return Ok(outcome);
    }

    found.sort();
    let zip_path = output_dir.join(zip_name);
    info!("Zipping {} selected intermediate items into {}", found.len(), zip_name);
    zip_paths(work_dir, &found, &zip_path)?;
    outcome.zip_path = Some(zip_path);
    Ok(outcome)
}

fn collect_selected(
    root: &Path,
    rel: &Path,
    files: &[String],
    folders: &[String],
    seen: &mut [bool],
    found: &mut Vec<PathBuf>,
) {
    let Ok(entries) = fs::read_dir(root.join(rel)) else {
        return;
    };
    for entry in entries.filter_map(Result::ok) {
        let name = entry.file_name().to_string_lossy().into_owned();
        let child = rel.join(&name);
        if entry.path().is_dir() {
            if let Some(i) = folders.iter().position(|f| *f == name) {
                seen[files.len() + i] = true;
                found.push(child);
                continue;
            }
            collect_selected(root, &child, files, folders, seen, found);
        } else if let Some(i) = files.iter().position(|f| *f == name) {
            seen[i] = true;
            found.push(child);
        }
    }
}

/// Remove the analysis directory once it has been archived
pub fn remove_output_dir(analysis_dir: &Path, keep: bool) -> Result<(), ArchiveError> {
    if !analysis_dir.exists() {
        info!("Output directory does not exist so it cannot be removed");
        return Ok(());
    }
    if keep {
        info!("NOT removing output directory {:?}", analysis_dir);
        return Ok(());
    }
    debug!("removing output directory {:?}", analysis_dir);
    fs::remove_dir_all(analysis_dir).map_err(io_err(analysis_dir))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn test_selected_nothing_requested() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let outcome =
            zip_intermediate_selected(work.path(), out.path(), &[], &[], "sel.zip").unwrap();
        assert_eq!(outcome, SelectedArchive::default());
    }

    #[test]
    fn test_selected_reports_missing_names() {
        let work = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        touch(&work.path().join("bids/sub-01/anat/sub-01_T1w.nii.gz"));

        let outcome = zip_intermediate_selected(
            work.path(),
            out.path(),
            &["nope.txt".to_string()],
            &["missing_dir".to_string()],
            "sel.zip",
        )
        .unwrap();
        assert_eq!(outcome.zip_path, None);
        assert_eq!(outcome.missing, ["nope.txt", "missing_dir"]);
    }

    #[test]
    fn test_collect_selected_matches_nested_names() {
        let work = tempfile::tempdir().unwrap();
        touch(&work.path().join("mriqc_wf/anatMRIQC/report.rst"));
        touch(&work.path().join("mriqc_wf/funcMRIQC/node/result.pklz"));
        touch(&work.path().join("other/report.rst"));

        let files = vec!["report.rst".to_string()];
        let folders = vec!["funcMRIQC".to_string()];
        let mut seen = vec![false; 2];
        let mut found = Vec::new();
        collect_selected(work.path(), Path::new(""), &files, &folders, &mut seen, &mut found);
        found.sort();

        assert_eq!(seen, [true, true]);
        assert_eq!(
            found,
            [
                PathBuf::from("mriqc_wf/anatMRIQC/report.rst"),
                PathBuf::from("mriqc_wf/funcMRIQC"),
                PathBuf::from("other/report.rst"),
            ]
        );
    }

    #[test]
    fn test_remove_output_dir() {
        let out = tempfile::tempdir().unwrap();
        let analysis = out.path().join("abc123");
        touch(&analysis.join("report.html"));

        remove_output_dir(&analysis, true).unwrap();
        assert!(analysis.exists());
        remove_output_dir(&analysis, false).unwrap();
        assert!(!analysis.exists());
        // Already gone
        remove_output_dir(&analysis, false).unwrap();
    }

    #[test]
    #[ignore = "requires the zip executable"]
    fn test_zip_output_and_htmls() {
        let out = tempfile::tempdir().unwrap();
        let analysis = out.path().join("abc123");
        touch(&analysis.join("sub-01_T1w.html"));
        touch(&analysis.join("sub-01/anat/sub-01_T1w.json"));

        let zip = zip_output(out.path(), "abc123", "mriqc_label_abc123.zip").unwrap();
        assert!(zip.is_file());

        let reports = zip_htmls(out.path(), &analysis).unwrap();
        assert_eq!(reports, [out.path().join("sub-01_T1w.html.zip")]);
        assert!(reports[0].is_file());
        assert!(!out.path().join(".html_staging_sub-01_T1w.html").exists());
    }
}
