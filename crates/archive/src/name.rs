//! Entry name validation.
//!
//! Zip entry names are `/`-separated paths relative to the archive root. They
//! are never OS paths, so they are validated as strings; [`from_path`] is the
//! bridge used when override entries are discovered on disk.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates and normalizes an archive entry name.
/// Ensures that names don't escape the archive root (no `..` traversal).
///
/// Empty and `.` segments are dropped, a leading `/` is removed, and a
/// trailing `/` (directory entry) is kept. Backslashes and NUL bytes are
/// rejected outright; APPNOTE requires forward slashes.
///
/// # Examples
///
/// ```
/// use splice_archive::validate_name;
/// // Valid names
/// assert!(validate_name("clojure/lang/RT.class").is_ok());
/// assert!(validate_name("a/../RT.class").is_ok()); // (never leaves archive root)
/// // Invalid names
/// assert!(validate_name("../RT.class").is_err());
/// assert!(validate_name("a\\b").is_err());
/// // Names get resolved
/// assert_eq!(validate_name("wrong/../META-INF//./MANIFEST.MF").unwrap(), "META-INF/MANIFEST.MF");
/// assert_eq!(validate_name("clojure/lang/").unwrap(), "clojure/lang/");
/// ```
pub fn validate(name: &str) -> Result<String> {
    if name.contains(['\0', '\\']) {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {},
            ".." => {
                if segments.pop().is_none() {
                    exn::bail!(ErrorKind::InvalidName(name.to_string()));
                }
            },
            s => segments.push(s),
        }
    }
    if segments.is_empty() {
        exn::bail!(ErrorKind::InvalidName(name.to_string()));
    }
    let mut normalized = segments.join("/");
    if name.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Builds an entry name from a path relative to an override root.
///
/// Every component must be a plain, UTF-8 file name; the result is joined
/// with `/` whatever the host separator is.
pub fn from_path(relative: impl AsRef<Path>) -> Result<String> {
    let relative = relative.as_ref();
    let invalid = || ErrorKind::InvalidName(relative.to_string_lossy().into_owned());
    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(s) => segments.push(s.to_str().ok_or_else(invalid)?),
            Component::CurDir => {},
            // Yeah, no. Walked paths are always plain and relative.
            Component::Prefix(_) | Component::RootDir | Component::ParentDir => exn::bail!(invalid()),
        }
    }
    validate(&segments.join("/"))
}
