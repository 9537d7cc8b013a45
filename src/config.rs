//! Preset files
//!
//! A preset is a small TOML file holding default arguments for a split,
//! e.g. a fixed dataset:
//!
//! ```toml
//! input = "data/action_types.xml"
//! output_dir = "data/split"
//! element = "action"
//! chunk_size = 500
//! mode = "all"
//! no_clobber = false
//! ```
//!
//! Every key is optional; command-line values take precedence. Relative
//! `input` and `output_dir` paths are taken relative to the directory
//! holding the preset file, not the working directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::dom::MatchMode;
use crate::error::SplitError;

#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Preset {
    #[serde(default)]
    pub input: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub element: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub no_clobber: Option<bool>,
}

impl Preset {
    pub fn load(path: &Path) -> Result<Preset, SplitError> {
        let text = fs::read_to_string(path).map_err(|e| SplitError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut preset = Self::from_toml(&text).map_err(|message| SplitError::Config {
            path: path.to_path_buf(),
            message,
        })?;

        let base = path.parent().unwrap_or(Path::new(""));
        preset.input = preset.input.map(|p| base.join(p));
        preset.output_dir = preset.output_dir.map(|p| base.join(p));
        Ok(preset)
    }

    pub fn from_toml(text: &str) -> Result<Preset, String> {
        let preset: Preset = toml::from_str(text).map_err(|e| format!("TOML parse error: {}", e))?;
        preset.match_mode()?;
        Ok(preset)
    }

    /// The preset's mode, if it names a valid one
    pub fn match_mode(&self) -> Result<Option<MatchMode>, String> {
        self.mode.as_deref().map(|m| m.parse::<MatchMode>()).transpose()
    }
}
