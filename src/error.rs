use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures while loading reference text from outside the session.
#[derive(Error, Debug)]
pub enum TextError {
    #[error("failed to read text from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} contains no text to practice", .0.display())]
    Empty(PathBuf),
}

/// Failures while persisting configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to write config: {0}")]
    Io(#[from] io::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_json::Error),
}
