use crate::app::diagnostics::Diagnostics;
use crate::app::document::DocumentError;
use crate::app::engine::TransformEngine;
use crate::app::error::{ErrorChain, TransformError, ValidationError};
use crate::app::matcher::PairMatcher;
use crate::app::models::{ConfigurationEntry, EntryErrorPolicy, RuntimeConfig};
use crate::app::scanner::Scanner;
use std::fs;
use std::path::PathBuf;

/// An entry that could not be loaded or written.
#[derive(Debug)]
pub struct EntryFailure {
    pub file_path: PathBuf,
    pub error: TransformError,
}

/// What a single run did.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Output files that were written.
    pub written: Vec<PathBuf>,
    /// Base files whose transform did not succeed or that had no usable name.
    pub skipped: Vec<PathBuf>,
    pub failed: Vec<EntryFailure>,
}

enum Outcome {
    Written(PathBuf),
    Skipped,
}

/// Walks the source tree, pairs configs with overlays and writes the
/// transformed documents into the mirrored target tree.
pub struct ConfigTransformer<'a, E> {
    config: RuntimeConfig,
    engine: E,
    log: Diagnostics<'a>,
}

impl<'a, E: TransformEngine> ConfigTransformer<'a, E> {
    pub fn new(config: RuntimeConfig, engine: E, log: Diagnostics<'a>) -> Self {
        Self {
            config,
            engine,
            log,
        }
    }

    pub fn run(&self) -> Result<RunReport, TransformError> {
        // Reported by the caller; nothing is logged here.
        self.validate()?;

        let candidates = Scanner::new(self.config.source_directory.clone())?.scan()?;
        self.log.debug(format_args!(
            "Found {} configuration files under {}",
            candidates.len(),
            self.config.source_directory.display()
        ));

        let matcher = PairMatcher::new(
            &self.config.build_configuration,
            &self.config.source_directory,
            &self.config.excluded,
            self.log.with_target("config_transformer::matcher"),
        );
        let entries = matcher.pair(&candidates);

        let mut report = RunReport::default();
        for entry in &entries {
            match self.process(entry) {
                Ok(Outcome::Written(output)) => report.written.push(output),
                Ok(Outcome::Skipped) => report.skipped.push(entry.file_path.clone()),
                Err(err) => {
                    if self.config.on_entry_error == EntryErrorPolicy::Abort {
                        return Err(err);
                    }
                    self.log.error(format_args!(
                        "{}: {}",
                        entry.file_path.display(),
                        ErrorChain(&err)
                    ));
                    report.failed.push(EntryFailure {
                        file_path: entry.file_path.clone(),
                        error: err,
                    });
                }
            }
        }

        self.log.info(format_args!(
            "Transformed {} of {} configuration files for {} ({} skipped, {} failed)",
            report.written.len(),
            entries.len(),
            self.config.build_configuration,
            report.skipped.len(),
            report.failed.len()
        ));
        Ok(report)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let config = &self.config;
        if !config.source_directory.is_dir() {
            return Err(ValidationError::SourceMissing(config.source_directory.clone()));
        }
        if !config.target_directory.is_dir() {
            return Err(ValidationError::TargetMissing(config.target_directory.clone()));
        }
        if config.build_configuration.trim().is_empty() {
            return Err(ValidationError::BlankBuildConfiguration);
        }
        Ok(())
    }

    fn process(&self, entry: &ConfigurationEntry) -> Result<Outcome, TransformError> {
        let mut document =
            self.engine
                .load(&entry.file_path)
                .map_err(|source| TransformError::Parse {
                    path: entry.file_path.clone(),
                    source,
                })?;

        let applied = self
            .engine
            .apply(&entry.transformation_file_path, &mut document)
            .map_err(|source| TransformError::Parse {
                path: entry.transformation_file_path.clone(),
                source,
            })?;

        if !applied {
            self.log.warn(format_args!(
                "Transformation {} failed for {}. Won't be written",
                entry.transformation_file_path.display(),
                entry.file_path.display()
            ));
            return Ok(Outcome::Skipped);
        }
        if entry.file_name.trim().is_empty() {
            self.log.warn(format_args!(
                "{} has no file name. Won't be written",
                entry.file_path.display()
            ));
            return Ok(Outcome::Skipped);
        }

        let directory = self.config.target_directory.join(&entry.parent_subfolder);
        fs::create_dir_all(&directory).map_err(|source| TransformError::Write {
            path: directory.clone(),
            source: DocumentError::Write {
                path: directory.clone(),
                source,
            },
        })?;

        let output = directory.join(&entry.file_name);
        self.engine
            .save(&document, &output)
            .map_err(|source| TransformError::Write {
                path: output.clone(),
                source,
            })?;

        self.log.info(format_args!(
            "{} + {} -> {}",
            entry.file_path.display(),
            entry.transformation_file_path.display(),
            output.display()
        ));
        Ok(Outcome::Written(output))
    }
}
