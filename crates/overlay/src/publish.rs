use crate::error::{ErrorKind, Result};
use exn::{OptionExt, ResultExt};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};

const TEMP_PREFIX: &str = ".splice-";

/// Where a merged archive is published: one real file plus any number of
/// alias paths that resolve to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    aliases: Vec<PathBuf>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), aliases: Vec::new() }
    }

    pub fn with_alias(mut self, alias: impl Into<PathBuf>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_aliases<I, P>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.aliases.extend(aliases.into_iter().map(Into::into));
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn aliases(&self) -> &[PathBuf] {
        &self.aliases
    }

    /// Run `write` against a temporary file next to the destination, then
    /// rename it into place together with the aliases.
    ///
    /// Every alias is staged before the destination is touched, so a failing
    /// write or alias leaves whatever was at the destination before as it
    /// was and no staged links behind.
    #[instrument(skip_all, fields(path = %self.path.display(), aliases = self.aliases.len()))]
    pub fn publish<F>(&self, write: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> splice_archive::error::Result<()>,
    {
        let failure = || ErrorKind::WriteFailure(self.path.clone());
        let dir = parent_dir(&self.path);
        fs::create_dir_all(dir).or_raise(failure)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_PREFIX).suffix(".tmp");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }
        let temp = builder.tempfile_in(dir).or_raise(failure)?;

        {
            let mut out = BufWriter::new(temp.as_file());
            write(&mut out).or_raise(failure)?;
            out.flush().or_raise(failure)?;
        }
        temp.as_file().sync_all().or_raise(failure)?;

        // Symlinks may dangle until the rename below; hard links share the
        // temporary file's inode and follow it into place.
        #[cfg(unix)]
        let source = std::path::absolute(&self.path).or_raise(failure)?;
        #[cfg(not(unix))]
        let source = temp.path().to_path_buf();
        let staged = self.stage_aliases(&source)?;

        if let Err(err) = temp.persist(&self.path) {
            discard(&staged);
            return Err::<(), _>(err.error).or_raise(failure);
        }
        debug!("archive renamed into place");

        for link in &staged {
            fs::rename(&link.staging, &link.alias).or_raise(|| ErrorKind::WriteFailure(link.alias.clone()))?;
            debug!(alias = %link.alias.display(), target = %source.display(), "alias linked");
        }
        Ok(())
    }

    /// Create a link to `source` next to every alias. On failure the links
    /// staged so far are removed again.
    fn stage_aliases(&self, source: &Path) -> Result<Vec<StagedLink>> {
        let mut staged = Vec::with_capacity(self.aliases.len());
        for alias in &self.aliases {
            if *alias == self.path {
                warn!(alias = %alias.display(), "alias is the artifact itself, skipping");
                continue;
            }
            match StagedLink::create(alias, source) {
                Ok(link) => staged.push(link),
                Err(err) => {
                    discard(&staged);
                    return Err(err);
                },
            }
        }
        Ok(staged)
    }
}

/// A link waiting under a temporary name to be renamed over its alias.
#[derive(Debug)]
struct StagedLink {
    staging: PathBuf,
    alias: PathBuf,
}

impl StagedLink {
    fn create(alias: &Path, source: &Path) -> Result<Self> {
        let failure = || ErrorKind::WriteFailure(alias.to_path_buf());
        let dir = parent_dir(alias);
        fs::create_dir_all(dir).or_raise(failure)?;
        let file_name = alias.file_name().ok_or_raise(failure)?;
        let staging = dir.join(format!("{TEMP_PREFIX}{}.link", file_name.to_string_lossy()));

        // Left over from an interrupted run.
        if fs::symlink_metadata(&staging).is_ok() {
            fs::remove_file(&staging).or_raise(failure)?;
        }
        #[cfg(unix)]
        std::os::unix::fs::symlink(source, &staging).or_raise(failure)?;
        #[cfg(not(unix))]
        fs::hard_link(source, &staging).or_raise(failure)?;

        Ok(Self { staging, alias: alias.to_path_buf() })
    }
}

fn discard(staged: &[StagedLink]) {
    for link in staged {
        if let Err(err) = fs::remove_file(&link.staging) {
            warn!(staging = %link.staging.display(), error = %err, "could not remove staged alias");
        }
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_archive::error::ErrorKind as ArchiveErrorKind;
    use tempfile::TempDir;

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .map(|item| item.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with(TEMP_PREFIX))
            .collect()
    }

    #[test]
    fn test_publish_writes_file() {
        let dir = TempDir::new().unwrap();
        let artifact = Artifact::new(dir.path().join("out/merged.jar"));
        artifact.publish(|out| Ok(out.write_all(b"contents").unwrap())).unwrap();

        assert_eq!(fs::read(artifact.path()).unwrap(), b"contents");
        assert!(leftovers(&dir.path().join("out")).is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.jar");
        fs::write(&path, b"previous").unwrap();

        let artifact = Artifact::new(&path);
        let err = artifact
            .publish(|out| {
                out.write_all(b"half").unwrap();
                exn::bail!(ArchiveErrorKind::Corrupt("boom".to_string()))
            })
            .unwrap_err();

        assert!(matches!(&*err, ErrorKind::WriteFailure(p) if *p == path));
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_replaces_existing_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.jar");
        fs::write(&path, b"old").unwrap();
        Artifact::new(&path).publish(|out| Ok(out.write_all(b"new").unwrap())).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
    }

    #[cfg(unix)]
    #[test]
    fn test_aliases_resolve_to_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("libs/clojure.jar");
        let alias = dir.path().join("classes/clojure.jar");
        let artifact = Artifact::new(&path).with_alias(&alias);

        artifact.publish(|out| Ok(out.write_all(b"v1").unwrap())).unwrap();
        assert!(fs::symlink_metadata(&alias).unwrap().file_type().is_symlink());
        assert_eq!(fs::read(&alias).unwrap(), b"v1");

        // Republishing re-links over the existing alias.
        artifact.publish(|out| Ok(out.write_all(b"v2").unwrap())).unwrap();
        assert_eq!(fs::read(&alias).unwrap(), b"v2");
        assert!(leftovers(&dir.path().join("classes")).is_empty());
    }

    #[test]
    fn test_alias_equal_to_path_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("merged.jar");
        Artifact::new(&path).with_alias(&path).publish(|out| Ok(out.write_all(b"x").unwrap())).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_failed_alias_keeps_destination_absent() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let path = dir.path().join("libs/clojure.jar");
        let good = dir.path().join("classes/clojure.jar");
        let artifact = Artifact::new(&path).with_alias(&good).with_alias(blocker.join("clojure.jar"));

        let err = artifact.publish(|out| Ok(out.write_all(b"new").unwrap())).unwrap_err();

        assert!(matches!(&*err, ErrorKind::WriteFailure(p) if *p == blocker.join("clojure.jar")));
        assert!(!path.exists());
        assert!(fs::symlink_metadata(&good).is_err());
        assert!(leftovers(&dir.path().join("libs")).is_empty());
        assert!(leftovers(&dir.path().join("classes")).is_empty());
    }

    #[test]
    fn test_failed_alias_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let path = dir.path().join("merged.jar");
        fs::write(&path, b"previous").unwrap();

        let artifact = Artifact::new(&path).with_alias(blocker.join("merged.jar"));
        assert!(artifact.publish(|out| Ok(out.write_all(b"new").unwrap())).is_err());
        assert_eq!(fs::read(&path).unwrap(), b"previous");
        assert!(leftovers(dir.path()).is_empty());
    }

    #[test]
    fn test_unwritable_destination() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let artifact = Artifact::new(blocker.join("merged.jar"));
        let err = artifact.publish(|_| Ok(())).unwrap_err();
        assert!(matches!(&*err, ErrorKind::WriteFailure(_)));
    }
}
