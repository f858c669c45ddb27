//! Gear run orchestrator.
//!
//! This module coordinates one gear run, from the configuration through
//! staging and execution to the packaged results. Problems are collected in
//! a [`RunReport`]; the run always reaches packaging so partial output is
//! returned even when the application fails.

use crate::bids::{run_bids_validator, write_bids_tree, DatasetSource, Hierarchy, RunLevel};
use crate::command::{build, CommandError, CommandSpec};
use crate::config::{GearConfig, GearOptions};
use crate::config_loader::{extract_parameters, CommandParameters};
use crate::process::{exec_command, load_environment, AnalysisLevel};
use crate::results::archive::{
    remove_output_dir, zip_all_intermediate_output, zip_htmls, zip_intermediate_selected,
    zip_output,
};
use crate::results::dry_run::pretend_it_ran;
use crate::results::metadata::dry_run_metadata;
use crate::results::{store_iqms, write_metadata, RunReport};
use crate::utils::{make_file_name_safe, set_performance_config, SystemResources};
use crate::BIDS_APP;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{error, info, warn};
use serde_json::json;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a run needs to know about where it is and what to do
#[derive(Debug, Clone)]
pub struct GearContext {
    pub config: GearConfig,
    /// Gear name used as the prefix of archive names
    pub gear_name: String,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub environment_file: PathBuf,
    pub hierarchy: Hierarchy,
}

impl GearContext {
    pub fn destination_id(&self) -> &str {
        &self.config.destination.id
    }

    /// Raw application output goes here before it is zipped
    pub fn analysis_dir(&self) -> PathBuf {
        self.output_dir.join(self.destination_id())
    }

    /// Where the BIDS dataset is staged
    pub fn bids_dir(&self) -> PathBuf {
        self.work_dir.join("bids")
    }
}

/// Build the application command for one analysis level.
///
/// Positional arguments follow the BIDS Apps convention:
/// `<bids dir> <output dir> <analysis level>`.
pub fn generate_command(
    parameters: &CommandParameters,
    bids_dir: &Path,
    analysis_dir: &Path,
    level: AnalysisLevel,
) -> Result<CommandSpec, CommandError> {
    let positional = vec![
        bids_dir.display().to_string(),
        analysis_dir.display().to_string(),
        level.as_str().to_string(),
    ];
    let command = build(BIDS_APP, &positional, &parameters.parameters, &parameters.passthrough)?;
    info!("command is: {}", command);
    Ok(command)
}

/// Run the gear and return the process exit code
pub fn run(
    context: &GearContext,
    source: &dyn DatasetSource,
    resources: &SystemResources,
) -> Result<i32> {
    let options = context.config.gear_options();
    let mut report = RunReport::new();

    let run_label = make_file_name_safe(&context.hierarchy.run_label);
    let analysis_dir = context.analysis_dir();
    info!(
        "Running at {} level for '{}' into {:?}",
        context.hierarchy.run_level, run_label, analysis_dir
    );

    for dir in [&context.output_dir, &context.work_dir] {
        fs::create_dir_all(dir)
            .wrap_err_with(|| format!("Failed to create directory '{}'", dir.display()))?;
    }

    let mut parameters = extract_parameters(&context.config.config)?;
    set_performance_config(&mut parameters.parameters, resources);

    let environ = load_environment(&context.environment_file)?;

    let command = match generate_command(
        &parameters,
        &context.bids_dir(),
        &analysis_dir,
        AnalysisLevel::Participant,
    ) {
        Ok(command) => Some(command),
        Err(e) => {
            report.error(e.to_string());
            None
        }
    };

    let command_name = make_file_name_safe(BIDS_APP);
    if report.has_errors() {
        info!("Did not stage BIDS data because of previous errors");
    } else {
        stage_dataset(context, source, &environ, &options, &command_name, &mut report);
    }

    match command {
        Some(_) if report.has_errors() => {
            info!("Command was NOT run because of previous errors.");
        }
        Some(command) if options.dry_run => {
            if let Err(e) = exec_command(&command, &environ, true) {
                report.error(e.to_string());
            }
            let msg = "gear-dry-run is set: Command was NOT run.";
            warn!("{}", msg);
            report.warning(msg);
            if let Err(e) = pretend_it_ran(&analysis_dir, &command_name) {
                report.error(format!("Dry run output could not be created: {}", e));
            }
        }
        Some(command) => {
            run_application(context, &command, &parameters, &environ, &mut report);
        }
        None => info!("Command was NOT run because of previous errors."),
    }

    let metadata = if options.dry_run {
        info!("Just dry run: no additional data.");
        dry_run_metadata()
    } else {
        store_iqms(&analysis_dir).unwrap_or_else(|| json!({}))
    };

    package_outputs(context, &options, &run_label, &mut report);

    if let Err(e) = write_metadata(&context.output_dir, &metadata) {
        report.error(format!("{:#}", e));
    }

    report.log_summary();
    let code = report.exit_code();
    info!("{} Gear is done.  Returning {}", context.gear_name, code);
    Ok(code)
}

fn stage_dataset(
    context: &GearContext,
    source: &dyn DatasetSource,
    environ: &BTreeMap<String, String>,
    options: &GearOptions,
    command_name: &str,
    report: &mut RunReport,
) {
    let staged = match source.stage(&context.bids_dir(), options.dry_run) {
        Ok(staged) => staged,
        Err(e) => {
            report.error(e.to_string());
            return;
        }
    };

    let tree_html = context.output_dir.join(format!("{}_bids_tree.html", command_name));
    let title = format!("{} BIDS Tree", command_name);
    if let Err(e) = write_bids_tree(&staged.root, &tree_html, &title) {
        report.warning(e.to_string());
    }

    let mut bids_errors = staged.error_count();
    if options.run_bids_validation && !options.dry_run {
        bids_errors += run_bids_validator(&staged.root, environ);
    }

    if bids_errors > 0 {
        if options.ignore_bids_errors {
            let msg = format!(
                "{} BIDS error(s) ignored because gear-ignore-bids-errors is set",
                bids_errors
            );
            warn!("{}", msg);
            report.warning(msg);
        } else {
            report.error(format!("BIDS Error(s) detected.  Did not run {}", BIDS_APP));
        }
    }
}

fn run_application(
    context: &GearContext,
    command: &CommandSpec,
    parameters: &CommandParameters,
    environ: &BTreeMap<String, String>,
    report: &mut RunReport,
) {
    let analysis_dir = context.analysis_dir();
    info!("Creating output directory {:?}", analysis_dir);
    if let Err(e) = fs::create_dir_all(&analysis_dir) {
        report.error(format!("Failed to create {}: {}", analysis_dir.display(), e));
        return;
    }

    if let Err(e) = exec_command(command, environ, false) {
        error!("Unable to execute command: {}", e);
        report.error(e.to_string());
        return;
    }

    if context.hierarchy.run_level == RunLevel::Project {
        run_group_level(context, parameters, environ, report);
    }
}

/// Summarise participant results at group level. Failures here are logged
/// but do not fail the run.
fn run_group_level(
    context: &GearContext,
    parameters: &CommandParameters,
    environ: &BTreeMap<String, String>,
    report: &mut RunReport,
) {
    let analysis_dir = context.analysis_dir();
    match generate_command(parameters, &context.bids_dir(), &analysis_dir, AnalysisLevel::Group) {
        Ok(command) => {
            if let Err(e) = exec_command(&command, environ, false) {
                warn!("Group level run failed: {}", e);
            }
        }
        Err(e) => warn!("Group level command not built: {}", e),
    }

    match copy_group_tsvs(&analysis_dir, &context.output_dir, context.destination_id()) {
        Ok(copied) if copied.is_empty() => {
            warn!("No group-level tsv files found in {:?}", analysis_dir)
        }
        Ok(copied) => info!("Group-level tsv files: {:?}", copied),
        Err(e) => report.warning(format!("Group-level tsv files not copied: {}", e)),
    }
}

/// Copy `<analysis_dir>/*.tsv` to `<output_dir>/<stem>_<destination_id>.tsv`
pub fn copy_group_tsvs(
    analysis_dir: &Path,
    output_dir: &Path,
    destination_id: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let mut copied = Vec::new();
    for entry in fs::read_dir(analysis_dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "tsv") {
            continue;
        }
        let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };
        let dest = output_dir.join(format!("{}_{}.tsv", stem, destination_id));
        fs::copy(&path, &dest)?;
        copied.push(dest);
    }
    copied.sort();
    Ok(copied)
}

fn package_outputs(
    context: &GearContext,
    options: &GearOptions,
    run_label: &str,
    report: &mut RunReport,
) {
    let destination_id = context.destination_id();
    let analysis_dir = context.analysis_dir();

    let zip_name = format!("{}_{}_{}.zip", context.gear_name, run_label, destination_id);
    if let Err(e) = zip_output(&context.output_dir, destination_id, &zip_name) {
        report.error(e.to_string());
    }

    if let Err(e) = zip_htmls(&context.output_dir, &analysis_dir) {
        report.error(e.to_string());
    }

    if options.save_intermediate_output {
        let name = format!("{}_work_{}_{}.zip", context.gear_name, run_label, destination_id);
        if let Err(e) = zip_all_intermediate_output(&context.work_dir, &context.output_dir, &name) {
            report.error(e.to_string());
        }
    }

    let name = format!("{}_work_selected_{}_{}.zip", context.gear_name, run_label, destination_id);
    match zip_intermediate_selected(
        &context.work_dir,
        &context.output_dir,
        &options.intermediate_files,
        &options.intermediate_folders,
        &name,
    ) {
        Ok(selected) => {
            for missing in selected.missing {
                report.warning(format!("Intermediate output '{}' not found", missing));
            }
        }
        Err(e) => report.error(e.to_string()),
    }

    if let Err(e) = remove_output_dir(&analysis_dir, options.keep_output) {
        report.error(e.to_string());
    }
}
