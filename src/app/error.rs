use crate::app::document::DocumentError;
use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Input problems detected before any file is touched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source directory {0} does not exist")]
    SourceMissing(PathBuf),
    #[error("target directory {0} does not exist")]
    TargetMissing(PathBuf),
    #[error("build configuration must not be blank")]
    BlankBuildConfiguration,
}

// Variants with a `#[source]` leave it out of their own message; the cause is
// rendered once by whoever prints the chain.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("input is invalid")]
    Validation(#[from] ValidationError),
    #[error("failed to enumerate configuration files under {root}")]
    Discovery {
        root: PathBuf,
        #[source]
        source: ignore::Error,
    },
    #[error("invalid file pattern")]
    Pattern(#[from] globset::Error),
    #[error("config could not be loaded")]
    Parse {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
    #[error("transformed config could not be written")]
    Write {
        path: PathBuf,
        #[source]
        source: DocumentError,
    },
}

/// Displays an error followed by its causes, as `outer: inner: root`.
pub struct ErrorChain<'e>(pub &'e (dyn StdError + 'static));

impl fmt::Display for ErrorChain<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)?;
        let mut cause = self.0.source();
        while let Some(err) = cause {
            write!(f, ": {}", err)?;
            cause = err.source();
        }
        Ok(())
    }
}
