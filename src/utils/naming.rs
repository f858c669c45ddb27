//! File name sanitising.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of characters that are not safe in an output file name
static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-.]+").expect("Invalid unsafe-character regex"));

/// Make a container label or program name safe to embed in a file name.
///
/// Unsafe character runs are removed and a leading `.` is dropped so the
/// result is never a hidden file.
///
/// # Examples
/// ```
/// use mriqc_gear::utils::naming::make_file_name_safe;
///
/// assert_eq!(make_file_name_safe("ses 01/(pre)"), "ses01pre");
/// assert_eq!(make_file_name_safe(".hidden"), "hidden");
/// ```
pub fn make_file_name_safe(name: &str) -> String {
    let safe = UNSAFE_CHARS.replace_all(name, "");
    safe.strip_prefix('.').unwrap_or(&safe).to_string()
}
