use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Apply build-configuration transforms to .config files"
)]
pub struct Cli {
    /// Directory searched recursively for *.config files
    pub source_directory: Option<PathBuf>,

    /// Directory that receives the transformed files
    pub target_directory: Option<PathBuf>,

    /// Build configuration whose overlays are applied (e.g. Debug, Release)
    pub build_configuration: Option<String>,

    /// Exact paths of base config files to leave untouched
    pub excluded: Vec<PathBuf>,

    /// Use a predefined set of options from presets.toml
    #[arg(long)]
    pub preset: Option<String>,

    /// Stop at the first config file that cannot be loaded or written
    #[arg(long)]
    pub fail_fast: bool,
}

/// The three required positionals, present only when all of them were given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub source_directory: PathBuf,
    pub target_directory: PathBuf,
    pub build_configuration: String,
}

impl Cli {
    pub fn request(&self) -> Option<Request> {
        Some(Request {
            source_directory: self.source_directory.clone()?,
            target_directory: self.target_directory.clone()?,
            build_configuration: self.build_configuration.clone()?,
        })
    }
}
