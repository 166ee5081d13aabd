use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use splice_archive::ArchiveEntry;
use splice_compress::Compression;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use time::{OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

/// How override files are turned into archive entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOptions {
    pub compression: Compression,
    /// Stamp entries with the file's modification time (UTC) instead of the
    /// DOS epoch. Makes the output depend on the checkout.
    pub preserve_timestamps: bool,
}

/// Replacement entries keyed by name. Iteration is always in name order.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    entries: BTreeMap<String, ArchiveEntry>,
}

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from explicit entries; a repeated name is an error.
    pub fn from_entries(entries: impl IntoIterator<Item = ArchiveEntry>) -> Result<Self> {
        let mut set = Self::new();
        for entry in entries {
            set.insert(entry)?;
        }
        Ok(set)
    }

    /// Collect every regular file below each directory, in order.
    pub fn from_dirs<P: AsRef<Path>>(roots: &[P], options: EntryOptions) -> Result<Self> {
        let mut set = Self::new();
        for root in roots {
            set.extend_from_dir(root, options)?;
        }
        Ok(set)
    }

    pub fn insert(&mut self, entry: ArchiveEntry) -> Result<()> {
        if self.entries.contains_key(entry.name()) {
            exn::bail!(ErrorKind::DuplicateOverrideName(entry.name().to_string()));
        }
        self.entries.insert(entry.name().to_string(), entry);
        Ok(())
    }

    /// Add every regular file below `root`, named by its path relative to
    /// `root` with `/` separators. Directories contribute no entries of their
    /// own and symlinks are skipped. Returns the number of entries added.
    #[instrument(skip(self, root), fields(root = %root.as_ref().display(), added))]
    pub fn extend_from_dir(&mut self, root: impl AsRef<Path>, options: EntryOptions) -> Result<usize> {
        let root = root.as_ref();
        if !root.is_dir() {
            exn::bail!(ErrorKind::MissingOverrideSource(root.to_path_buf()));
        }

        let mut added = 0;
        for item in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let item = item.or_raise(|| ErrorKind::MissingOverrideSource(root.to_path_buf()))?;
            let file_type = item.file_type();
            if file_type.is_symlink() {
                warn!(path = %item.path().display(), "skipping symlink in override directory");
                continue;
            }
            if !file_type.is_file() {
                continue;
            }

            let path = item.path();
            let relative = path.strip_prefix(root).or_raise(|| ErrorKind::InvalidEntryName(path.to_path_buf()))?;
            let name =
                splice_archive::name_from_path(relative).or_raise(|| ErrorKind::InvalidEntryName(relative.to_path_buf()))?;
            let payload = fs::read(path).or_raise(|| ErrorKind::MissingOverrideSource(path.to_path_buf()))?;

            let mut entry = ArchiveEntry::new(&name, payload)
                .or_raise(|| ErrorKind::InvalidEntryName(relative.to_path_buf()))?
                .with_compression(options.compression);
            if options.preserve_timestamps {
                let modified = item
                    .metadata()
                    .ok()
                    .and_then(|metadata| metadata.modified().ok())
                    .map(OffsetDateTime::from);
                match modified {
                    Some(modified) => entry = entry.with_modified(PrimitiveDateTime::new(modified.date(), modified.time())),
                    None => warn!(path = %path.display(), "no modification time, keeping the DOS epoch"),
                }
            }

            debug!(%name, size = entry.payload().len(), "override entry");
            self.insert(entry)?;
            added += 1;
        }

        tracing::Span::current().record("added", added);
        Ok(added)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.get(name)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &ArchiveEntry> {
        self.entries.values()
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
