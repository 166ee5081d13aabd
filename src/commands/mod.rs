mod batch;
mod list;
mod merge;
mod verify;

use crate::cli::{Cli, Command};
use crate::error::{Classify, ErrorKind, Result};
use exn::ResultExt;
use splice_archive::BaseArchive;
use splice_config::Config;
use std::path::Path;

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Merge(args) => merge::run(&load_config(cli.config.as_deref())?, args),
        Command::Batch(args) => batch::run(&load_config(cli.config.as_deref())?, args),
        Command::List(args) => list::run(&args.archive),
        Command::Verify(args) => verify::run(&args.archive),
    }
}

fn load_config(explicit: Option<&Path>) -> Result<Config> {
    Config::load(explicit).classify()
}

/// Open an archive given on the command line.
fn open_archive(path: &Path) -> Result<BaseArchive> {
    if !path.exists() {
        exn::bail!(ErrorKind::MissingInput);
    }
    BaseArchive::open(path).or_raise(|| ErrorKind::InvalidInput)
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_missing_archive() {
        let dir = TempDir::new().unwrap();
        let err = open_archive(&dir.path().join("absent.jar")).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingInput);
    }

    #[test]
    fn test_open_garbage() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.jar");
        std::fs::write(&path, b"garbage").unwrap();
        assert_eq!(*open_archive(&path).unwrap_err(), ErrorKind::InvalidInput);
    }
}
