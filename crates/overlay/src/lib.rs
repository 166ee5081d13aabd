//! Patch-and-repackage for zip and jar archives.
//!
//! An [`OverrideSet`] (usually freshly built output directories) is laid over
//! a [`BaseArchive`](splice_archive::BaseArchive). Overrides always win a name
//! collision, base entries matched by an [`Exclude`] predicate are dropped,
//! and everything else from the base is copied through byte for byte.
//!
//! ```no_run
//! use splice_overlay::{Artifact, EntryOptions, ExcludePatterns, OverrideSet, merge_into};
//!
//! let overrides = OverrideSet::from_dirs(&["build/classes"], EntryOptions::default())?;
//! let artifact = Artifact::new("build/libs/clojure-patched.jar");
//! let report = merge_into("clojure-1.12.0.jar", &overrides, &ExcludePatterns::signatures(), &artifact)?;
//! println!("replaced {} entries", report.replaced.len());
//! # Ok::<(), splice_overlay::error::Error>(())
//! ```

mod batch;
pub mod error;
mod exclude;
mod merge;
mod overrides;
mod publish;

pub use crate::batch::{JobOutcome, MergeJob, run_batch, summarize};
pub use crate::exclude::{DEFAULT_EXCLUDES, Exclude, ExcludePatterns};
pub use crate::merge::{MergePlan, MergeReport, Planned, merge_into};
pub use crate::overrides::{EntryOptions, OverrideSet};
pub use crate::publish::Artifact;
