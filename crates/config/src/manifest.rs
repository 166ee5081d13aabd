use crate::error::{ErrorKind, Result};
use crate::{Config, merge_file};
use exn::ResultExt;
use figment::Figment;
use serde::Deserialize;
use splice_compress::Compression;
use splice_overlay::{Artifact, EntryOptions, ExcludePatterns, MergeJob};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// A list of independent merges, read from TOML, YAML or JSON.
///
/// ```toml
/// [[merge]]
/// base = "clojure-1.12.0.jar"
/// overrides = ["build/classes/java/main"]
/// output = "build/libs/clojure-1.12.0-1.jar"
/// aliases = ["build/libs/clojure.jar"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(rename = "merge", default)]
    pub merges: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    pub base: PathBuf,
    #[serde(default)]
    pub overrides: Vec<PathBuf>,
    pub output: PathBuf,
    #[serde(default)]
    pub aliases: Vec<PathBuf>,
    /// Replaces the configured exclusion list for this merge only.
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
    #[serde(default)]
    pub compression: Option<Compression>,
    #[serde(default)]
    pub preserve_timestamps: Option<bool>,
}

impl Manifest {
    /// Read a manifest; relative paths inside it are resolved against the
    /// manifest's own directory.
    #[instrument(fields(path = %path.as_ref().display()), skip(path))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            exn::bail!(ErrorKind::NotFound(path.to_path_buf()));
        }
        let mut manifest: Self = merge_file(Figment::new(), path)?
            .extract()
            .or_raise(|| ErrorKind::Invalid(format!("cannot parse manifest {}", path.display())))?;
        if manifest.merges.is_empty() {
            exn::bail!(ErrorKind::Invalid(format!("manifest {} declares no merges", path.display())));
        }

        let root = path.parent().unwrap_or(Path::new(""));
        for entry in &mut manifest.merges {
            entry.resolve(root);
        }
        debug!(merges = manifest.merges.len(), "manifest loaded");
        Ok(manifest)
    }

    /// Turn every entry into a merge job, falling back to `config` for
    /// whatever the entry leaves unset.
    pub fn jobs(&self, config: &Config) -> splice_overlay::error::Result<Vec<MergeJob>> {
        self.merges.iter().map(|entry| entry.job(config)).collect()
    }
}

impl ManifestEntry {
    fn resolve(&mut self, root: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = root.join(&*path);
            }
        };
        join(&mut self.base);
        join(&mut self.output);
        self.overrides.iter_mut().for_each(join);
        self.aliases.iter_mut().for_each(join);
    }

    pub fn job(&self, config: &Config) -> splice_overlay::error::Result<MergeJob> {
        let exclude = ExcludePatterns::new(self.exclude.as_ref().unwrap_or(&config.exclude))?;
        let options = EntryOptions {
            compression: self.compression.unwrap_or(config.compression),
            preserve_timestamps: self.preserve_timestamps.unwrap_or(config.preserve_timestamps),
        };
        Ok(MergeJob::new(&self.base, Artifact::new(&self.output).with_aliases(&self.aliases))
            .with_overrides(&self.overrides)
            .with_exclude(exclude)
            .with_options(options))
    }
}
