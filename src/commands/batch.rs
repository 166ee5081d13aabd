use crate::cli::BatchArgs;
use crate::commands::merge::summary;
use crate::error::{Classify, ErrorKind, Result};
use exn::ResultExt;
use splice_config::error::ErrorKind as ConfigErrorKind;
use splice_config::{Config, Manifest};
use splice_overlay::{run_batch, summarize};
use std::num::NonZeroUsize;
use tracing::instrument;

#[instrument(skip_all, fields(manifest = %args.manifest.display()))]
pub fn run(config: &Config, args: BatchArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest).map_err(|err| {
        let kind = match &*err {
            ConfigErrorKind::NotFound(_) => ErrorKind::MissingInput,
            other => ErrorKind::from(other),
        };
        err.raise(kind)
    })?;
    let jobs = manifest.jobs(config).classify()?;
    let concurrency = concurrency(args.jobs, config.jobs);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .max_blocking_threads(concurrency.get())
        .build()
        .or_raise(|| ErrorKind::Unexpected)?;
    let outcomes = runtime.block_on(run_batch(jobs, concurrency));

    for outcome in &outcomes {
        match &outcome.result {
            Ok(report) => println!("{}", summary(&splice_overlay::Artifact::new(&outcome.output), report)),
            Err(err) => eprintln!("{}: {}", outcome.output.display(), **err),
        }
    }

    // Exit with the status of the first failed job.
    let first_failure = outcomes
        .iter()
        .find_map(|outcome| outcome.result.as_ref().err())
        .map(|err| ErrorKind::from(&**err))
        .unwrap_or(ErrorKind::Unexpected);
    summarize(&outcomes).or_raise(|| first_failure)?;
    Ok(())
}

/// Command line first, then configuration, then the available parallelism.
fn concurrency(flag: Option<NonZeroUsize>, configured: Option<usize>) -> NonZeroUsize {
    flag.or_else(|| configured.and_then(NonZeroUsize::new))
        .or_else(|| std::thread::available_parallelism().ok())
        .unwrap_or(NonZeroUsize::MIN)
}
