use crate::error::{ErrorKind, Result};
use crate::exclude::ExcludePatterns;
use crate::merge::{MergeReport, merge_into};
use crate::overrides::{EntryOptions, OverrideSet};
use crate::publish::Artifact;
use exn::ResultExt;
use futures::StreamExt;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument};

/// Everything needed to produce one merged archive.
#[derive(Debug, Clone)]
pub struct MergeJob {
    pub base: PathBuf,
    pub overrides: Vec<PathBuf>,
    pub artifact: Artifact,
    pub exclude: ExcludePatterns,
    pub options: EntryOptions,
}

impl MergeJob {
    pub fn new(base: impl Into<PathBuf>, artifact: Artifact) -> Self {
        Self {
            base: base.into(),
            overrides: Vec::new(),
            artifact,
            exclude: ExcludePatterns::signatures(),
            options: EntryOptions::default(),
        }
    }

    pub fn with_overrides<I, P>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.overrides.extend(overrides.into_iter().map(Into::into));
        self
    }

    pub fn with_exclude(mut self, exclude: ExcludePatterns) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn with_options(mut self, options: EntryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn output(&self) -> &Path {
        self.artifact.path()
    }

    /// Collect the overrides and publish the merged archive. Blocking.
    pub fn run(&self) -> Result<MergeReport> {
        let overrides = OverrideSet::from_dirs(&self.overrides, self.options)?;
        merge_into(&self.base, &overrides, &self.exclude, &self.artifact)
    }
}

/// The result of one job of a batch.
#[derive(Debug)]
pub struct JobOutcome {
    /// Position of the job in the submitted list.
    pub index: usize,
    pub output: PathBuf,
    pub result: Result<MergeReport>,
}

/// Run independent merges on the blocking thread pool, at most `concurrency`
/// at a time. A failing job does not stop the others; outcomes are returned
/// in submission order.
#[instrument(skip(jobs), fields(jobs = jobs.len()))]
pub async fn run_batch(jobs: Vec<MergeJob>, concurrency: NonZeroUsize) -> Vec<JobOutcome> {
    let mut outcomes = futures::stream::iter(jobs.into_iter().enumerate())
        .map(|(index, job)| async move {
            let output = job.output().to_path_buf();
            let joined = tokio::task::spawn_blocking(move || job.run()).await;
            let result = match joined {
                Ok(result) => result,
                Err(join) => Err::<MergeReport, _>(join).or_raise(|| ErrorKind::JobAborted(output.clone())),
            };
            match &result {
                Ok(report) => info!(output = %output.display(), entries = report.total(), "merge finished"),
                Err(err) => error!(output = %output.display(), "merge failed: {err:?}"),
            }
            JobOutcome { index, output, result }
        })
        .buffer_unordered(concurrency.get())
        .collect::<Vec<_>>()
        .await;
    outcomes.sort_by_key(|outcome| outcome.index);
    outcomes
}

/// Collapse a batch into a single result, raising [`ErrorKind::BatchFailed`]
/// when any job failed.
pub fn summarize(outcomes: &[JobOutcome]) -> Result<usize> {
    match outcomes.iter().filter(|outcome| outcome.result.is_err()).count() {
        0 => Ok(outcomes.len()),
        failed => exn::bail!(ErrorKind::BatchFailed(failed)),
    }
}
