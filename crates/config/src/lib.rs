//! Layered configuration for splice.
//!
//! Values are merged from, lowest priority first:
//!
//! 1. built-in defaults,
//! 2. `config.toml` in the user's configuration directory (if present),
//! 3. an explicit file given on the command line (must exist),
//! 4. `SPLICE_*` environment variables.

pub mod error;
mod manifest;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use serde::{Deserialize, Serialize};
use splice_compress::Compression;
use splice_overlay::{DEFAULT_EXCLUDES, EntryOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use crate::manifest::{Manifest, ManifestEntry};

const ENV_PREFIX: &str = "SPLICE_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Glob patterns for base entries to drop.
    pub exclude: Vec<String>,
    /// Compression applied to override entries.
    pub compression: Compression,
    /// Use override files' modification times instead of the DOS epoch.
    pub preserve_timestamps: bool,
    /// Batch concurrency; defaults to the available parallelism.
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            exclude: DEFAULT_EXCLUDES.iter().map(|pattern| pattern.to_string()).collect(),
            compression: Compression::default(),
            preserve_timestamps: false,
            jobs: None,
        }
    }
}

impl Config {
    /// Load from every layer, using the per-user configuration file if there is one.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        Self::load_from(user_config_path(), explicit)
    }

    pub fn load_from(user: Option<PathBuf>, explicit: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(user) = user {
            debug!(path = %user.display(), "user configuration");
            // A missing file is simply an empty layer here.
            figment = figment.merge(Toml::file(user));
        }
        if let Some(path) = explicit {
            if !path.is_file() {
                exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
            }
            figment = merge_file(figment, path)?;
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        let config: Self = figment.extract().or_raise(|| ErrorKind::Invalid("cannot parse configuration".to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jobs == Some(0) {
            exn::bail!(ErrorKind::Invalid("jobs must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn entry_options(&self) -> EntryOptions {
        EntryOptions { compression: self.compression, preserve_timestamps: self.preserve_timestamps }
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "splice").map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Merge a file into `figment`, picking the format from its extension.
pub(crate) fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
    Ok(match extension.as_deref() {
        Some("toml") => figment.merge(Toml::file_exact(path)),
        Some("yaml" | "yml") => figment.merge(Yaml::file_exact(path)),
        Some("json") => figment.merge(Json::file_exact(path)),
        _ => exn::bail!(ErrorKind::UnsupportedFormat(path.display().to_string())),
    })
}
