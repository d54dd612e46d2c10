use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::correction::JoinPoints;
use crate::errors::{PrepError, Result};
use crate::io::{ProcessOptions, DEFAULT_OUTPUT_SUFFIX};
use crate::loader::FitsLayout;

pub const CONFIG_ENV: &str = "SPECPREP_CONFIG";

/// Location named by `SPECPREP_CONFIG`, if set.
fn env_config_path() -> Option<PathBuf> {
    std::env::var_os(CONFIG_ENV).map(PathBuf::from)
}

/// A path named on the command line or by `SPECPREP_CONFIG`.
fn named_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(env_config_path)
}

/// Explicit path, then `SPECPREP_CONFIG`, then the per-user default.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    named_config_path(explicit).unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home).join(".config/specprep/config.toml");
    }
    PathBuf::from(".specprep.toml")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "default_correct_txt_offsets")]
    pub correct_txt_offsets: bool,
    #[serde(default = "default_output_suffix")]
    pub output_suffix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
    #[serde(default)]
    pub offsets: JoinPoints,
    #[serde(default)]
    pub fits: FitsLayout,
}

fn default_correct_txt_offsets() -> bool {
    true
}
fn default_output_suffix() -> String {
    DEFAULT_OUTPUT_SUFFIX.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            overwrite: false,
            correct_txt_offsets: default_correct_txt_offsets(),
            output_suffix: default_output_suffix(),
            jobs: None,
            offsets: JoinPoints::default(),
            fits: FitsLayout::default(),
        }
    }
}

impl Config {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let s = fs::read_to_string(path).map_err(|e| PrepError::config_load(path, e))?;
        Self::from_toml(&s).map_err(|e| e.with_context("path", path.display().to_string()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| PrepError::config_parse("<toml>", e.to_string()))
    }

    /// Explicit path, then `SPECPREP_CONFIG`, then the per-user default.
    /// Only the per-user default may be absent.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = named_config_path(explicit) {
            return Self::load_from_path(&path);
        }
        let path = default_config_path();
        if path.is_file() {
            Self::load_from_path(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| PrepError::config_parse("<toml>", e.to_string()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                PrepError::io("create_dir", e).with_context("path", parent.display().to_string())
            })?;
        }
        fs::write(path, self.to_toml()?)
            .map_err(|e| PrepError::io("write", e).with_context("path", path.display().to_string()))
    }

    /// Writes the effective configuration to `dest`, or to the resolved
    /// config path when `dest` is `None`. A source config that is missing or
    /// malformed is replaced by the defaults, since this is how such a file
    /// gets (re)created. Returns the path written.
    pub fn init_file(explicit: Option<&Path>, dest: Option<PathBuf>, force: bool) -> Result<PathBuf> {
        let dest = dest.unwrap_or_else(|| config_path(explicit));
        if dest.exists() && !force {
            return Err(PrepError::validation(format!(
                "{} already exists (use --force to replace it)",
                dest.display()
            ))
            .with_context("operation", "init_config"));
        }
        let config = Self::resolve(explicit).unwrap_or_else(|e| {
            warn!(error = %e, "starting from default configuration");
            Self::default()
        });
        config.save_to_path(&dest)?;
        Ok(dest)
    }

    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            overwrite: self.overwrite,
            correct_txt_offsets: self.correct_txt_offsets,
            joins: self.offsets,
            layout: self.fits.clone(),
            output_suffix: self.output_suffix.clone(),
            jobs: self.jobs,
        }
    }
}
