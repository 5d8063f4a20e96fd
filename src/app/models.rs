use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// What to do when loading or writing a single entry fails.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryErrorPolicy {
    /// Log the failure, record it and move on to the next entry.
    #[default]
    Continue,
    /// Stop the run at the first failing entry.
    Abort,
}

/// The fully resolved request after merging presets and CLI args.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source_directory: PathBuf,
    pub target_directory: PathBuf,
    pub build_configuration: String,
    pub excluded: HashSet<PathBuf>,
    pub on_entry_error: EntryErrorPolicy,
}

/// A base configuration paired with the overlay for the active build
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationEntry {
    pub file_path: PathBuf,
    pub file_name: String,
    /// Directory of `file_path` relative to the source root; empty at the root.
    pub parent_subfolder: PathBuf,
    pub transformation_file_path: PathBuf,
}
