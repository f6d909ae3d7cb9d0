use std::{io, path::PathBuf};

use thiserror::Error;

/// A document could not be loaded.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} is {len} bytes, over the {max} byte limit", path.display())]
    TooLarge { path: PathBuf, len: u64, max: u64 },
}

impl ReadError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } | Self::TooLarge { path, .. } => path,
        }
    }
}

/// A document could not be written.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("could not write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl WriteError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Io { path, .. } => path,
        }
    }
}

/// The settings file exists but is unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read settings from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid settings in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
