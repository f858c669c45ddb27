//! BIDS dataset staging.
//!
//! The wrapped application reads a BIDS directory from the work area. This
//! module decides the run level, copies the dataset into place, limited to
//! the modality folders the application uses, checks the basic BIDS layout
//! and optionally runs `bids-validator`.

use crate::command::{build, ParameterMap};
use crate::process::exec_command;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Modality folders copied for the application; empty means all
pub const DOWNLOAD_MODALITIES: &[&str] = &["anat", "func"];

/// Whether `sourcedata/` (e.g. DICOMs) is staged
pub const DOWNLOAD_SOURCE: bool = false;

/// Required top-level dataset file
const DATASET_DESCRIPTION: &str = "dataset_description.json";

/// Level of the hierarchy the gear was launched at
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum RunLevel {
    Project,
    Subject,
    Session,
}

impl RunLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunLevel::Project => "project",
            RunLevel::Subject => "subject",
            RunLevel::Session => "session",
        }
    }
}

impl fmt::Display for RunLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the hierarchy this run sits
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    pub run_level: RunLevel,
    /// Label of the project, subject or session; part of output file names
    pub run_label: String,
}

/// Errors raised while staging a dataset
#[derive(Debug, thiserror::Error)]
pub enum BidsError {
    #[error("BIDS source directory not found: {path}")]
    SourceNotFound { path: String },

    #[error("Failed to copy {path}: {source}")]
    Copy {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write BIDS tree {path}: {source}")]
    Tree {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Outcome of staging a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Where the dataset can be read: the staging directory, or the source
    /// itself when nothing was copied
    pub root: PathBuf,
    pub files_copied: usize,
    /// Problems that make the dataset unusable as BIDS
    pub errors: Vec<String>,
}

impl StagingReport {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }
}

/// Supplier of the BIDS dataset a run works on
pub trait DatasetSource {
    /// Place the dataset at `dest` and report BIDS problems. A dry run
    /// checks the dataset where it is and copies nothing.
    fn stage(&self, dest: &Path, dry_run: bool) -> Result<StagingReport, BidsError>;
}

/// Dataset already present on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalDatasetSource {
    root: PathBuf,
    folders: Vec<String>,
    include_source: bool,
}

impl LocalDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            folders: DOWNLOAD_MODALITIES.iter().map(|s| s.to_string()).collect(),
            include_source: DOWNLOAD_SOURCE,
        }
    }

    /// Restrict staging to these modality folders (empty means all)
    pub fn with_folders(mut self, folders: Vec<String>) -> Self {
        self.folders = folders;
        self
    }

    pub fn with_source_data(mut self, include: bool) -> Self {
        self.include_source = include;
        self
    }

    /// Whether the directory at `rel` (relative to the dataset root) is staged
    fn wants_dir(&self, rel: &Path) -> bool {
        let parts: Vec<&str> = rel.iter().filter_map(|c| c.to_str()).collect();
        let Some(first) = parts.first() else {
            return true;
        };

        if *first == "sourcedata" {
            return self.include_source;
        }
        if !first.starts_with("sub-") || self.folders.is_empty() {
            return true;
        }

        // sub-XX/<datatype> or sub-XX/ses-YY/<datatype>
        let datatype = match parts.len() {
            2 if !parts[1].starts_with("ses-") => Some(parts[1]),
            3 if parts[1].starts_with("ses-") => Some(parts[2]),
            _ => None,
        };
        datatype.map_or(true, |d| self.folders.iter().any(|f| f == d))
    }

    fn copy_tree(
        &self,
        from: &Path,
        rel: &Path,
        dest: &Path,
        copied: &mut usize,
    ) -> Result<(), BidsError> {
        let dir = from.join(rel);
        let copy_err = |path: &Path, source: io::Error| BidsError::Copy {
            path: path.display().to_string(),
            source,
        };

        let mut entries: Vec<_> = fs::read_dir(&dir)
            .map_err(|e| copy_err(&dir, e))?
            .collect::<Result<_, _>>()
            .map_err(|e| copy_err(&dir, e))?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let child_rel = rel.join(entry.file_name());
            let target = dest.join(&child_rel);
            let file_type = entry.file_type().map_err(|e| copy_err(&entry.path(), e))?;

            if file_type.is_dir() {
                if !self.wants_dir(&child_rel) {
                    continue;
                }
                fs::create_dir_all(&target).map_err(|e| copy_err(&target, e))?;
                self.copy_tree(from, &child_rel, dest, copied)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| copy_err(&entry.path(), e))?;
                *copied += 1;
            }
        }
        Ok(())
    }
}

impl DatasetSource for LocalDatasetSource {
    fn stage(&self, dest: &Path, dry_run: bool) -> Result<StagingReport, BidsError> {
        if !self.root.is_dir() {
            return Err(BidsError::SourceNotFound {
                path: self.root.display().to_string(),
            });
        }

        let mut report = StagingReport::default();
        if dry_run {
            info!("Dry run: not staging BIDS data, checking {:?} in place", self.root);
            report.root = self.root.clone();
        } else {
            info!("Staging BIDS data from {:?} to {:?}", self.root, dest);
            fs::create_dir_all(dest).map_err(|source| BidsError::Copy {
                path: dest.display().to_string(),
                source,
            })?;
            self.copy_tree(&self.root, Path::new(""), dest, &mut report.files_copied)?;
            info!("Copied {} files", report.files_copied);
            report.root = dest.to_path_buf();
        }

        report.errors = check_layout(&report.root);
        for problem in &report.errors {
            error!("BIDS error: {}", problem);
        }
        Ok(report)
    }
}

/// Basic layout checks: a dataset description and at least one subject
pub fn check_layout(root: &Path) -> Vec<String> {
    let mut errors = Vec::new();

    if !root.join(DATASET_DESCRIPTION).is_file() {
        errors.push(format!("{} is missing from {}", DATASET_DESCRIPTION, root.display()));
    }

    let has_subject = fs::read_dir(root)
        .map(|entries| {
            entries.filter_map(Result::ok).any(|e| {
                e.path().is_dir() && e.file_name().to_string_lossy().starts_with("sub-")
            })
        })
        .unwrap_or(false);
    if !has_subject {
        errors.push(format!("No sub-* folders found in {}", root.display()));
    }

    errors
}

/// Run `bids-validator` on the staged dataset. Returns the number of
/// errors (0 or 1) it contributes.
pub fn run_bids_validator(root: &Path, environment: &BTreeMap<String, String>) -> usize {
    let positional = vec![root.display().to_string()];
    let command = match build("bids-validator", &positional, &ParameterMap::new(), &[]) {
        Ok(command) => command,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    match exec_command(&command, environment, false) {
        Ok(()) => {
            info!("bids-validator found no errors");
            0
        }
        Err(e) => {
            warn!("bids-validator reported problems: {}", e);
            1
        }
    }
}

/// Write an HTML listing of the staged dataset
pub fn write_bids_tree(root: &Path, html_path: &Path, title: &str) -> Result<(), BidsError> {
    let mut lines = Vec::new();
    collect_tree(root, 0, &mut lines);

    let html = format!(
        concat!(
            "<html>\n<head><title>{title}</title></head>\n<body>\n",
            "<h1>{title}</h1>\n<pre>\n{}/\n{}</pre>\n</body>\n</html>\n",
        ),
        root.display(),
        lines.join("\n"),
        title = escape_html(title),
    );

    fs::write(html_path, html).map_err(|source| BidsError::Tree {
        path: html_path.display().to_string(),
        source,
    })?;
    info!("Wrote BIDS tree to {:?}", html_path);
    Ok(())
}

fn collect_tree(dir: &Path, depth: usize, lines: &mut Vec<String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let name = escape_html(&entry.file_name().to_string_lossy());
        let indent = "    ".repeat(depth + 1);
        if entry.path().is_dir() {
            lines.push(format!("{}{}/", indent, name));
            collect_tree(&entry.path(), depth + 1, lines);
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
