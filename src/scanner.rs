//! Recursive file discovery with directory-name and extension exclusions.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ScanError;

const READ_DIR_FAIL_TAG: &str = "__slocount_read_dir_fail__";
const ENTRY_ITER_FAIL_TAG: &str = "__slocount_entry_iter_fail__";
pub(crate) const FAULT_ENV_VAR: &str = "SLOCOUNT_ENABLE_FAULTS";

/// Directory basenames and file extensions to leave out of a scan.
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    dir_names: HashSet<String>,
    extensions: HashSet<String>,
}

impl ExclusionSet {
    pub fn new<D, E, S, T>(dir_names: D, extensions: E) -> Self
    where
        D: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: Into<String>,
        T: AsRef<str>,
    {
        ExclusionSet {
            dir_names: dir_names.into_iter().map(Into::into).collect(),
            extensions: extensions
                .into_iter()
                .map(|ext| normalize_extension(ext.as_ref()).to_string())
                .collect(),
        }
    }

    /// Builds the set from comma-separated lists as given on the command line.
    pub fn parse(dir_names: Option<&str>, extensions: Option<&str>) -> Self {
        ExclusionSet::new(split_list(dir_names), split_list(extensions))
    }

    pub fn excludes_dir(&self, name: &str) -> bool {
        self.dir_names.contains(name)
    }

    /// Accepts the extension with or without its leading dot.
    pub fn excludes_extension(&self, extension: &str) -> bool {
        self.extensions.contains(normalize_extension(extension))
    }
}

fn split_list(list: Option<&str>) -> Vec<String> {
    list.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn normalize_extension(extension: &str) -> &str {
    extension.trim_start_matches('.')
}

/// Extension token of a path: the file name from its last dot onwards,
/// dot included. Empty when there is no dot or the dot ends the name.
pub fn extension_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => name[idx..].to_string(),
        _ => String::new(),
    }
}

/// Files found by [`scan`] plus the directories that could not be read.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    pub files: Vec<PathBuf>,
    pub errors: Vec<ScanError>,
}

/// Walks `root` depth-first. Within each directory the files are collected
/// before any subdirectory is entered. A directory that cannot be read is
/// reported and skipped without affecting its siblings.
pub fn scan(root: &Path, exclusions: &ExclusionSet) -> ScanOutcome {
    let mut outcome = ScanOutcome::default();
    if root.is_file() {
        if !exclusions.excludes_extension(&extension_of(root)) {
            outcome.files.push(root.to_path_buf());
        }
        return outcome;
    }
    scan_directory(root, exclusions, &mut outcome);
    outcome
}

fn scan_directory(dir: &Path, exclusions: &ExclusionSet, outcome: &mut ScanOutcome) {
    let entries = match read_dir_sorted(dir, outcome) {
        Ok(entries) => entries,
        Err(source) => {
            warn!("Error reading directory {}: {}", dir.display(), source);
            outcome.errors.push(ScanError::DirectoryAccess {
                path: dir.to_path_buf(),
                source,
            });
            return;
        }
    };

    let mut subdirectories = Vec::new();
    for entry in entries {
        let entry_path = entry.path();
        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(err) => {
                warn!("Error reading type for {}: {}", entry_path.display(), err);
                continue;
            }
        };

        if file_type.is_dir() {
            let name = entry.file_name();
            if exclusions.excludes_dir(&name.to_string_lossy()) {
                debug!("skipping excluded directory {}", entry_path.display());
            } else {
                subdirectories.push(entry_path);
            }
        } else if file_type.is_symlink() && entry_path.is_dir() {
            debug!("skipping symlinked directory {}", entry_path.display());
        } else if file_type.is_file() || (file_type.is_symlink() && entry_path.is_file()) {
            if !exclusions.excludes_extension(&extension_of(&entry_path)) {
                outcome.files.push(entry_path);
            }
        }
    }

    for subdirectory in subdirectories {
        scan_directory(&subdirectory, exclusions, outcome);
    }
}

/// Reads a directory's entries ordered by name. Errors from individual
/// entries are recorded against the directory and the rest are kept.
fn read_dir_sorted(dir: &Path, outcome: &mut ScanOutcome) -> io::Result<Vec<fs::DirEntry>> {
    if should_simulate_failure(dir, READ_DIR_FAIL_TAG) {
        return Err(io::Error::other("simulated read_dir failure"));
    }
    let mut entries = Vec::new();
    if should_simulate_failure(dir, ENTRY_ITER_FAIL_TAG) {
        record_entry_error(
            dir,
            io::Error::other("simulated directory entry iteration failure"),
            outcome,
        );
    }
    for entry in fs::read_dir(dir)? {
        match entry {
            Ok(entry) => entries.push(entry),
            Err(err) => record_entry_error(dir, err, outcome),
        }
    }
    entries.sort_by_key(|entry| entry.file_name());
    Ok(entries)
}

fn record_entry_error(dir: &Path, source: io::Error, outcome: &mut ScanOutcome) {
    warn!("Error reading entry in {}: {}", dir.display(), source);
    outcome.errors.push(ScanError::DirectoryAccess {
        path: dir.to_path_buf(),
        source,
    });
}

pub(crate) fn failure_injection_enabled() -> bool {
    cfg!(test) || std::env::var_os(FAULT_ENV_VAR).is_some()
}

pub(crate) fn should_simulate_failure(path: &Path, needle: &str) -> bool {
    failure_injection_enabled()
        && path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == needle)
            .unwrap_or(false)
}
