use crate::commands::open_archive;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use splice_archive::BaseEntry;
use std::io::{self, Write};
use std::path::Path;
use time::macros::format_description;

pub fn run(path: &Path) -> Result<()> {
    let archive = open_archive(path)?;
    let mut stdout = io::stdout().lock();
    for entry in archive.entries() {
        writeln!(stdout, "{}", line(&entry)).or_raise(|| ErrorKind::Unexpected)?;
    }
    Ok(())
}

fn line(entry: &BaseEntry<'_>) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let method = match entry.compression() {
        Ok(compression) => compression.to_string(),
        Err(_) => format!("method {}", entry.method()),
    };
    let modified = entry
        .modified()
        .and_then(|modified| modified.format(format).ok())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{method:>8} {:>10} {:>10}  {modified}  {}",
        entry.compressed_size(),
        entry.size(),
        entry.name()
    )
}
