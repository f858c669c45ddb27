//! Compute resource detection and the `n_cpus` / `mem_gb` policy.
//!
//! The wrapped application is told how many threads and how much memory it
//! may use. A configured value of 0 (or no value) means "use everything
//! available"; a value above what is available is lowered to the maximum.

use crate::command::{ParameterMap, ParameterValue};
use log::{info, warn};
use std::fs;

/// Parameter carrying the thread count
pub const N_CPUS_KEY: &str = "n_cpus";
/// Parameter carrying the memory limit in GiB
pub const MEM_GB_KEY: &str = "mem_gb";

const MEMINFO_PATH: &str = "/proc/meminfo";

/// Resources available on this machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemResources {
    pub cpus: u64,
    /// Available memory in whole GiB, if it could be determined
    pub mem_gb: Option<u64>,
}

impl SystemResources {
    pub fn detect() -> Self {
        let cpus = num_cpus::get() as u64;
        info!("cpu count = {}", cpus);

        let mem_gb = match fs::read_to_string(MEMINFO_PATH) {
            Ok(content) => parse_mem_available_gb(&content),
            Err(e) => {
                warn!("Cannot read {}: {}", MEMINFO_PATH, e);
                None
            }
        };
        match mem_gb {
            Some(gb) => info!("available memory = {} GiB", gb),
            None => warn!("Available memory could not be determined"),
        }

        Self { cpus, mem_gb }
    }
}

/// Extract `MemAvailable` from `/proc/meminfo` content, floored to GiB
pub fn parse_mem_available_gb(meminfo: &str) -> Option<u64> {
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("MemAvailable:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<u64>().ok())
        .map(|kb| kb / (1024 * 1024))
}

/// Set `n_cpus` and `mem_gb` in the parameters, clamped to what is available
pub fn set_performance_config(parameters: &mut ParameterMap, resources: &SystemResources) {
    clamp_to_available(parameters, N_CPUS_KEY, resources.cpus);

    match resources.mem_gb {
        Some(available) => clamp_to_available(parameters, MEM_GB_KEY, available),
        None => warn!("Leaving {} as configured", MEM_GB_KEY),
    }
}

/// Zero or missing means the maximum. A fractional request within the
/// limit is passed on unchanged.
fn clamp_to_available(parameters: &mut ParameterMap, name: &str, available: u64) {
    let requested = parameters.get(name).and_then(configured_amount);
    match requested {
        Some(amount) if amount > 0.0 && amount > available as f64 => {
            warn!("{} > number available, using max {}", name, available);
            parameters.insert(name, ParameterValue::from(available));
        }
        Some(amount) if amount > 0.0 => {
            info!("{} using {} from config", name, amount);
            if amount.fract() == 0.0 {
                parameters.insert(name, ParameterValue::from(amount as u64));
            }
        }
        _ => {
            info!("using {} = {} (maximum available)", name, available);
            parameters.insert(name, ParameterValue::from(available));
        }
    }
}

fn configured_amount(value: &ParameterValue) -> Option<f64> {
    let amount = match value {
        ParameterValue::Number(n) => n.as_f64(),
        ParameterValue::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    amount.filter(|a: &f64| a.is_finite() && *a >= 0.0)
}
