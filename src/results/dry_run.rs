//! Placeholder output for dry runs.
//!
//! A dry run skips the application but still exercises packaging, so the
//! analysis directory is filled with a stand-in report.

use log::info;
use std::fs;
use std::io;
use std::path::Path;

/// Create a placeholder report in `analysis_dir` as if `program` had run
pub fn pretend_it_ran(analysis_dir: &Path, program: &str) -> io::Result<()> {
    fs::create_dir_all(analysis_dir)?;

    let report = analysis_dir.join(format!("{}_dry_run.html", program));
    fs::write(
        &report,
        format!(
            "<html>\n<body>\n<p>Dry run: {} was not executed.</p>\n</body>\n</html>\n",
            program
        ),
    )?;
    info!("Dry run: wrote placeholder output {:?}", report);
    Ok(())
}
