//! Shared utilities: option merging, file naming, resource detection.

pub mod naming;
pub mod options;
pub mod resources;

pub use naming::make_file_name_safe;
pub use options::merge_options;
pub use resources::{set_performance_config, SystemResources};
