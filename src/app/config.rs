use crate::app::cli::{Cli, Request};
use crate::app::models::{EntryErrorPolicy, RuntimeConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

#[derive(Deserialize, Debug)]
struct PresetsFile {
    #[serde(flatten)]
    presets: HashMap<String, PresetConfig>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct PresetConfig {
    exclude: Option<Vec<PathBuf>>,
    on_entry_error: Option<EntryErrorPolicy>,
}

fn presets_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home
        .join(".config")
        .join("config_transformer")
        .join("presets.toml"))
}

/// Reads `~/.config/config_transformer/presets.toml`; a missing file means no presets.
pub fn load_presets_file() -> Result<HashMap<String, PresetConfig>> {
    let config_path = presets_path()?;

    if !config_path.exists() {
        return Ok(HashMap::new());
    }

    let content = fs::read_to_string(&config_path)
        .context(format!("Failed to read config at {:?}", config_path))?;

    parse_presets(&content)
}

fn parse_presets(content: &str) -> Result<HashMap<String, PresetConfig>> {
    let parsed: PresetsFile = toml::from_str(content).context("Failed to parse presets.toml")?;
    Ok(parsed.presets)
}

/// Preset exclusions first, then CLI ones, without duplicates.
fn merge_exclusions(preset: Option<Vec<PathBuf>>, cli: &[PathBuf]) -> HashSet<PathBuf> {
    preset
        .unwrap_or_default()
        .into_iter()
        .chain(cli.iter().cloned())
        .collect()
}

pub fn resolve_config(
    cli: &Cli,
    request: Request,
    presets: &HashMap<String, PresetConfig>,
) -> RuntimeConfig {
    // Preset to use: CLI flag > source folder name > None
    let source_name = request
        .source_directory
        .file_name()
        .and_then(|name| name.to_str());
    let preset_key = cli.preset.as_deref().or(source_name);
    if let Some(missing) = cli.preset.as_deref().filter(|k| !presets.contains_key(*k)) {
        log::warn!("Preset '{}' not found in presets.toml", missing);
    }
    let preset = preset_key
        .and_then(|k| presets.get(k))
        .cloned()
        .unwrap_or_default();

    let on_entry_error = if cli.fail_fast {
        EntryErrorPolicy::Abort
    } else {
        preset.on_entry_error.unwrap_or_default()
    };

    RuntimeConfig {
        excluded: merge_exclusions(preset.exclude, &cli.excluded),
        source_directory: request.source_directory,
        target_directory: request.target_directory,
        build_configuration: request.build_configuration,
        on_entry_error,
    }
}
