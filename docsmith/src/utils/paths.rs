//! Path utilities for docsmith.
//!
//! - Cross-platform path normalization for display
//! - Python file discovery with gitignore support

use crate::constants::DEFAULT_EXCLUDE_FOLDERS;
use std::path::{Path, PathBuf};

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" or ".\" prefix (for cleaner output)
///
/// # Examples
/// ```
/// use std::path::Path;
/// use docsmith::utils::normalize_display_path;
///
/// assert_eq!(normalize_display_path(Path::new(".\\pkg\\mod.py")), "pkg/mod.py");
/// assert_eq!(normalize_display_path(Path::new("./src/main.py")), "src/main.py");
/// ```
#[must_use]
pub fn normalize_display_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    // Strip Windows extended path prefix if present
    let clean = s.trim_start_matches(r"\\?\");
    let normalized = clean.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

/// Checks if a name matches any exclusion pattern.
/// Supports exact matching and wildcard patterns starting with `*.`.
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    for exclude in excludes {
        if let Some(suffix) = exclude.strip_prefix('*') {
            if name.ends_with(suffix) {
                return true;
            }
        } else if name == exclude {
            return true;
        }
    }
    false
}

/// Expands the given targets into the Python files to document.
///
/// Files are taken as given (whatever their extension); directories are
/// walked with the `ignore` crate so `.gitignore`, `.git/info/exclude` and the
/// global gitignore are respected IN ADDITION to the default exclusions
/// (venv, `node_modules`, build, etc.). The result is sorted and deduplicated
/// so runs are reproducible.
///
/// Walk errors are printed to stderr only when `verbose` is set.
#[must_use]
pub fn collect_python_files(
    targets: &[PathBuf],
    exclude: &[String],
    verbose: bool,
) -> Vec<PathBuf> {
    use ignore::WalkBuilder;

    let mut all_excludes: Vec<String> = exclude.to_vec();
    all_excludes.extend(DEFAULT_EXCLUDE_FOLDERS().iter().map(|&s| s.to_owned()));

    let mut files = Vec::new();
    for target in targets {
        if !target.is_dir() {
            files.push(target.clone());
            continue;
        }

        let excludes_for_filter = all_excludes.clone();
        let root_for_filter = target.clone();
        let walker = WalkBuilder::new(target)
            .hidden(false) // Don't skip hidden files (we handle that with defaults)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .filter_entry(move |entry| {
                if entry.path() == root_for_filter {
                    return true;
                }
                // Only filter directories - files are filtered by extension below
                if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    return true;
                }
                entry
                    .file_name()
                    .to_str()
                    .is_none_or(|name| !is_excluded(name, &excludes_for_filter))
            })
            .build();

        for result in walker {
            match result {
                Ok(entry) => {
                    let path = entry.path();
                    let is_file = entry.file_type().is_some_and(|ft| ft.is_file());
                    if is_file && path.extension().is_some_and(|ext| ext == "py") {
                        files.push(path.to_path_buf());
                    }
                }
                Err(e) => {
                    if verbose {
                        eprintln!("Walk error: {e}");
                    }
                }
            }
        }
    }

    files.sort();
    files.dedup();
    files
}
