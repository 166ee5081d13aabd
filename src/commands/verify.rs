use crate::commands::open_archive;
use crate::error::{ErrorKind, Result};
use std::path::Path;
use tracing::{debug, error, info, instrument};

#[instrument(fields(path = %path.display()), skip(path))]
pub fn run(path: &Path) -> Result<()> {
    let archive = open_archive(path)?;
    let mut failed = 0;
    for entry in archive.entries().filter(|entry| !entry.is_dir()) {
        match entry.read() {
            Ok(payload) => debug!(name = entry.name(), size = payload.len(), "ok"),
            Err(err) => {
                error!(name = entry.name(), "{err:?}");
                failed += 1;
            },
        }
    }

    match failed {
        0 => {
            info!(entries = archive.len(), "archive verified");
            println!("{}: {} entries OK", path.display(), archive.len());
            Ok(())
        },
        failed => exn::bail!(ErrorKind::VerifyFailed(failed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures::write_archive;
    use splice_archive::{ArchiveEntry, ArchiveWriter, Compression};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_valid_archive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jar");
        let payload = b"aaaa".repeat(64);
        write_archive(&path, &[("META-INF/", b""), ("a.txt", payload.as_slice())]);
        assert!(run(&path).is_ok());
    }

    #[test]
    fn test_damaged_payload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jar");
        let mut writer = ArchiveWriter::new(Vec::new());
        let entry = ArchiveEntry::new("a.txt", b"plain text".to_vec()).unwrap().with_compression(Compression::Stored);
        writer.add(&entry).unwrap();
        fs::write(&path, writer.finish().unwrap()).unwrap();

        // Stored payload follows the 30 byte local header and the name.
        let mut bytes = fs::read(&path).unwrap();
        bytes[30 + "a.txt".len()] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let err = run(&path).unwrap_err();
        assert_eq!(*err, ErrorKind::VerifyFailed(1));
    }
}
