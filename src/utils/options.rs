//! Option map merging utilities.

use serde_json::{Map, Value};

/// Merge two option maps, with overrides taking precedence over defaults.
///
/// Keys keep the position they first appeared at; keys only present in
/// the overrides are appended in override order.
pub fn merge_options(
    defaults: Option<&Map<String, Value>>,
    overrides: Option<&Map<String, Value>>,
) -> Map<String, Value> {
    let mut merged = Map::new();

    // Apply defaults first
    if let Some(defs) = defaults {
        for (k, v) in defs {
            merged.insert(k.clone(), v.clone());
        }
    }

    // Apply overrides (these take precedence)
    if let Some(ovrs) = overrides {
        for (k, v) in ovrs {
            merged.insert(k.clone(), v.clone());
        }
    }

    merged
}
