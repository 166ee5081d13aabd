use crate::cli::MergeArgs;
use crate::error::{Classify, Result};
use splice_config::Config;
use splice_overlay::{Artifact, EntryOptions, ExcludePatterns, MergeReport, OverrideSet, merge_into};

pub fn run(config: &Config, args: MergeArgs) -> Result<()> {
    let mut exclude = match args.no_default_excludes {
        true => ExcludePatterns::none(),
        false => ExcludePatterns::new(&config.exclude).classify()?,
    };
    exclude.extend(&args.exclude).classify()?;

    let options = EntryOptions {
        compression: args.compression.unwrap_or(config.compression),
        preserve_timestamps: args.preserve_timestamps || config.preserve_timestamps,
    };
    let overrides = OverrideSet::from_dirs(&args.overrides, options).classify()?;
    let artifact = Artifact::new(args.output).with_aliases(args.aliases);
    let report = merge_into(&args.base, &overrides, &exclude, &artifact).classify()?;

    println!("{}", summary(&artifact, &report));
    Ok(())
}

pub(crate) fn summary(artifact: &Artifact, report: &MergeReport) -> String {
    format!(
        "{}: {} entries ({} from overrides, {} replaced, {} excluded)",
        artifact.path().display(),
        report.total(),
        report.overrides,
        report.replaced.len(),
        report.excluded.len()
    )
}
