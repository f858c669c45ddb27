//! # mriqc-gear - Gear wrapper for the MRIQC BIDS App
//!
//! This library prepares a BIDS dataset, turns the gear configuration into
//! an MRIQC command line, runs it and packages the results.
//!
//! ## Overview
//!
//! A gear run is driven by a `config.json` whose `config` section mixes
//! gear-internal settings (keys starting with `gear-`) with options for the
//! wrapped application. Application options are translated into flags by
//! [`command::build`]:
//!
//! - one-character names become short flags (`-w /work`)
//! - `true` booleans become bare flags, `false` ones are left out
//! - empty values become presence-only flags (`--fd_thres`)
//! - whitespace-separated lists use the nargs form (`--modality T1w T2w`)
//! - everything else uses `--name=value`
//! - `verbose` becomes a count flag (`vvv` -> `-vvv`)
//!
//! ## Architecture
//!
//! - `command`: parameter types and the command builder
//! - `config`: typed run configuration and manifest
//! - `config_loader`: loading, manifest defaults and parameter extraction
//! - `bids`: run level and dataset staging
//! - `process`: environment loading and external command execution
//! - `results`: metadata, archives and the end-of-run report
//! - `utils`: option merging, file naming, resource detection
//! - `orchestrator`: the end-to-end run
//!
//! ## Example Usage
//!
//! ```rust
//! use mriqc_gear::command::{build, ParameterMap, ParameterValue};
//!
//! let mut params = ParameterMap::new();
//! params.insert("verbose", ParameterValue::from("vvv"));
//! params.insert("modality", ParameterValue::from("T1w T2w"));
//!
//! let positional = vec!["/bids".to_string(), "/out".to_string(), "participant".to_string()];
//! let cmd = build("mriqc", &positional, &params, &[])?;
//! assert_eq!(cmd.to_string(), "mriqc /bids /out participant -vvv --modality T1w T2w");
//! # Ok::<(), mriqc_gear::command::CommandError>(())
//! ```
//!
//! ## Error Handling
//!
//! Module-level failures are `thiserror` enums; the orchestration layer and
//! the binary use `color_eyre` for reporting with context.

pub mod bids;
pub mod command;
pub mod config;
pub mod config_loader;
pub mod orchestrator;
pub mod process;
pub mod results;
pub mod utils;

/// The BIDS App this gear wraps
pub const BIDS_APP: &str = "mriqc";

/// Gear name used when no manifest is available
pub const GEAR_NAME: &str = "bids-mriqc";
