// Declare modules
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod models;
pub mod scanner;
pub mod transformer;
pub mod xdt;

use anyhow::{Context, Result};
use clap::Parser;

use self::cli::Cli;
use self::config::{load_presets_file, resolve_config};
use self::diagnostics::Diagnostics;
use self::transformer::ConfigTransformer;
use self::xdt::XdtEngine;

/// Initializes components and orchestrates data flow.
pub fn run() -> Result<()> {
    // 1. Parse Args
    let args = Cli::parse();

    // Fewer than three positionals is a silent no-op.
    let Some(request) = args.request() else {
        return Ok(());
    };

    // 2. Resolve Configuration
    let presets = load_presets_file()?;
    let config = resolve_config(&args, request, &presets);
    let build_configuration = config.build_configuration.clone();

    // 3. Transform
    let engine = XdtEngine::new(Diagnostics::global("config_transformer::xdt"));
    let transformer = ConfigTransformer::new(
        config,
        engine,
        Diagnostics::global("config_transformer::transformer"),
    );
    let report = transformer
        .run()
        .context(format!("Failed to transform configs for {}", build_configuration))?;

    for failure in &report.failed {
        log::warn!("⚠️ {} was not transformed", failure.file_path.display());
    }

    Ok(())
}
