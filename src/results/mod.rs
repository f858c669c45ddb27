//! Result handling module.
//!
//! Everything that happens after the application ran: metadata, archives,
//! clean-up and the final error/warning report.

pub mod archive;
pub mod dry_run;
pub mod metadata;
pub mod report;

pub use metadata::{store_iqms, write_metadata};
pub use report::RunReport;
