//! User settings, read from `<config dir>/mdpad/config.toml`.
//!
//! Every key is optional. A missing file means defaults; a malformed one is an error the
//! caller decides how to report.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{close::SaveFailurePolicy, error::ConfigError};

const APP_DIR: &str = "mdpad";
const FILE_NAME: &str = "config.toml";

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub editor: EditorSettings,
    pub close: CloseSettings,
    pub log: LogSettings,
}

/// How the editor and preview share the window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Layout {
    /// Editor above, preview below.
    #[default]
    Stacked,
    SideBySide,
}

impl Layout {
    pub const fn toggle(self) -> Self {
        match self {
            Self::Stacked => Self::SideBySide,
            Self::SideBySide => Self::Stacked,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Stacked => "Stacked",
            Self::SideBySide => "Side-by-side",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub layout: Layout,
    /// Extensions offered by the file dialogs' Markdown filter.
    pub extensions: Vec<String>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            extensions: vec!["md".to_owned(), "markdown".to_owned()],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CloseSettings {
    pub on_save_failure: SaveFailurePolicy,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// An `env_logger` filter; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

impl Settings {
    /// Where the settings file lives on this platform, if there is a config dir at all.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    /// Load from [`Settings::default_path`], falling back to defaults when there is no file.
    pub fn load_default() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(path, &source)
    }

    fn parse(path: &Path, source: &str) -> Result<Self, ConfigError> {
        toml::from_str(source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
