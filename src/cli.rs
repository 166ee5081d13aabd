use clap::{ArgAction, Args, Parser, Subcommand};
use splice_compress::Compression;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Parser)]
#[command(name = "splice", version, about = "Overlay freshly built entries onto a zip or jar archive")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log more; repeat for more detail
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Overlay override directories onto a base archive
    Merge(MergeArgs),
    /// Run every merge declared in a manifest
    Batch(BatchArgs),
    /// List the entries of an archive
    List(ArchiveArgs),
    /// Decompress every entry and check its checksum
    Verify(ArchiveArgs),
}

#[derive(Debug, Args)]
pub struct MergeArgs {
    /// Archive to patch
    #[arg(long, value_name = "ARCHIVE")]
    pub base: PathBuf,

    /// Directories whose files replace or extend the base entries
    #[arg(long, value_name = "DIR", required = true, num_args = 1..)]
    pub overrides: Vec<PathBuf>,

    /// Where to write the merged archive
    #[arg(short, long, value_name = "ARCHIVE")]
    pub output: PathBuf,

    /// Drop base entries matching this glob (in addition to the configured list)
    #[arg(long = "exclude", value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Ignore the configured exclusion list, signature files included
    #[arg(long)]
    pub no_default_excludes: bool,

    /// Compression for override entries
    #[arg(long, value_name = "METHOD", value_parser = parse_compression)]
    pub compression: Option<Compression>,

    /// Keep override files' modification times instead of the DOS epoch
    #[arg(long)]
    pub preserve_timestamps: bool,

    /// Additional path that should resolve to the merged archive
    #[arg(long = "alias", value_name = "PATH")]
    pub aliases: Vec<PathBuf>,
}

#[derive(Debug, Args)]
pub struct BatchArgs {
    /// Manifest declaring the merges (TOML, YAML or JSON)
    pub manifest: PathBuf,

    /// Maximum number of merges running at once
    #[arg(short, long)]
    pub jobs: Option<NonZeroUsize>,
}

#[derive(Debug, Args)]
pub struct ArchiveArgs {
    pub archive: PathBuf,
}

fn parse_compression(value: &str) -> Result<Compression, String> {
    Compression::from_str(value).map_err(|err| (*err).to_string())
}
