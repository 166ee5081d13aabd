use crate::error::{ErrorKind, Result};
use crate::exclude::Exclude;
use crate::overrides::OverrideSet;
use crate::publish::Artifact;
use exn::ResultExt;
use splice_archive::{ArchiveEntry, ArchiveWriter, BaseArchive, BaseEntry};
use std::collections::HashSet;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// One entry of the merged archive and where it comes from.
#[derive(Debug, Clone, Copy)]
pub enum Planned<'a> {
    Override(&'a ArchiveEntry),
    Base(BaseEntry<'a>),
}

impl<'a> Planned<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            Self::Override(entry) => entry.name(),
            Self::Base(entry) => entry.name(),
        }
    }

    pub fn is_override(&self) -> bool {
        matches!(self, Self::Override(_))
    }
}

/// The merged archive, resolved but not yet written.
///
/// Overrides come first in name order, followed by the surviving base entries
/// in their original order. Every name appears exactly once.
#[derive(Debug)]
pub struct MergePlan<'a> {
    entries: Vec<Planned<'a>>,
    replaced: Vec<&'a str>,
    excluded: Vec<&'a str>,
    duplicates: Vec<&'a str>,
    comment: &'a [u8],
}

impl<'a> MergePlan<'a> {
    pub fn new<E>(base: &'a BaseArchive, overrides: &'a OverrideSet, exclude: &E) -> Self
    where
        E: Exclude + ?Sized,
    {
        let mut written: HashSet<&'a str> = HashSet::with_capacity(base.len() + overrides.len());
        let mut entries = Vec::with_capacity(base.len() + overrides.len());
        let (mut replaced, mut excluded, mut duplicates) = (Vec::new(), Vec::new(), Vec::new());

        for entry in overrides.iter() {
            written.insert(entry.name());
            entries.push(Planned::Override(entry));
        }

        for entry in base.entries() {
            let name = entry.name();
            if overrides.contains(name) {
                debug!(name, "replaced by override");
                replaced.push(name);
            } else if written.contains(name) {
                warn!(name, "base archive repeats an entry, keeping the first");
                duplicates.push(name);
            } else if exclude.excludes(name) {
                debug!(name, "excluded");
                excluded.push(name);
            } else {
                written.insert(name);
                entries.push(Planned::Base(entry));
            }
        }

        Self { entries, replaced, excluded, duplicates, comment: base.comment() }
    }

    pub fn entries(&self) -> &[Planned<'a>] {
        &self.entries
    }

    pub fn names(&self) -> impl ExactSizeIterator<Item = &'a str> + '_ {
        self.entries.iter().map(Planned::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Base entries shadowed by an override of the same name.
    pub fn replaced(&self) -> &[&'a str] {
        &self.replaced
    }

    /// Base entries dropped by the exclusion predicate.
    pub fn excluded(&self) -> &[&'a str] {
        &self.excluded
    }

    /// Later copies of a name the base archive holds more than once.
    pub fn duplicates(&self) -> &[&'a str] {
        &self.duplicates
    }

    /// Serialize the plan. Base entries are copied without recompression and
    /// the base archive's comment is carried over.
    #[instrument(skip_all, fields(entries = self.entries.len()))]
    pub fn write_to<W: Write>(&self, writer: W) -> splice_archive::error::Result<W> {
        let mut archive = ArchiveWriter::new(writer);
        for planned in &self.entries {
            match planned {
                Planned::Override(entry) => archive.add(entry)?,
                Planned::Base(entry) => archive.copy_raw(entry)?,
            }
        }
        if !self.comment.is_empty() {
            archive.set_comment(self.comment)?;
        }
        archive.finish()
    }

    pub fn report(&self) -> MergeReport {
        let overrides = self.entries.iter().filter(|planned| planned.is_override()).count();
        MergeReport {
            overrides,
            preserved: self.entries.len() - overrides,
            replaced: self.replaced.iter().map(|name| name.to_string()).collect(),
            excluded: self.excluded.iter().map(|name| name.to_string()).collect(),
            duplicates: self.duplicates.len(),
        }
    }
}

/// What a merge did, for logging and the CLI summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries written from the override set.
    pub overrides: usize,
    /// Base entries copied through unchanged.
    pub preserved: usize,
    /// Base entries shadowed by an override, in base order.
    pub replaced: Vec<String>,
    /// Base entries dropped by the exclusion predicate, in base order.
    pub excluded: Vec<String>,
    /// Repeated base entries that were dropped.
    pub duplicates: usize,
}

impl MergeReport {
    pub fn total(&self) -> usize {
        self.overrides + self.preserved
    }
}

/// Merge `overrides` onto the archive at `base` and publish the result.
///
/// The base archive is read completely before anything is written, so `base`
/// and the artifact path may be the same file.
#[instrument(skip_all, fields(base = %base.as_ref().display(), output = %artifact.path().display()))]
pub fn merge_into<E>(
    base: impl AsRef<Path>,
    overrides: &OverrideSet,
    exclude: &E,
    artifact: &Artifact,
) -> Result<MergeReport>
where
    E: Exclude + ?Sized,
{
    let base = base.as_ref();
    let archive = BaseArchive::open(base).or_raise(|| ErrorKind::CorruptArchive(base.to_path_buf()))?;
    let plan = MergePlan::new(&archive, overrides, exclude);
    artifact.publish(|out| plan.write_to(out).map(drop))?;

    let report = plan.report();
    info!(
        overrides = report.overrides,
        preserved = report.preserved,
        replaced = report.replaced.len(),
        excluded = report.excluded.len(),
        "merged archive written"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exclude::ExcludePatterns;
    use splice_compress::Compression;

    fn base(entries: &[(&str, &[u8])]) -> BaseArchive {
        let mut writer = ArchiveWriter::new(Vec::new());
        for (name, payload) in entries {
            writer.add(&ArchiveEntry::new(name, payload.to_vec()).unwrap()).unwrap();
        }
        BaseArchive::from_bytes(writer.finish().unwrap()).unwrap()
    }

    fn overrides(entries: &[(&str, &[u8])]) -> OverrideSet {
        OverrideSet::from_entries(entries.iter().map(|(name, payload)| ArchiveEntry::new(name, payload.to_vec()).unwrap()))
            .unwrap()
    }

    fn merged(plan: &MergePlan<'_>) -> BaseArchive {
        BaseArchive::from_bytes(plan.write_to(Vec::new()).unwrap()).unwrap()
    }

    #[test]
    fn test_override_replaces_base_entry() {
        let base = base(&[("a.class", b"A1"), ("b.class", b"B1")]);
        let overrides = overrides(&[("a.class", b"A2")]);
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::none());

        assert_eq!(plan.names().collect::<Vec<_>>(), ["a.class", "b.class"]);
        assert_eq!(plan.replaced(), ["a.class"]);

        let out = merged(&plan);
        assert_eq!(out.get("a.class").unwrap().read().unwrap(), b"A2");
        assert_eq!(out.get("b.class").unwrap().read().unwrap(), b"B1");
    }

    #[test]
    fn test_overrides_first_then_base_order() {
        let base = base(&[("z.txt", b"z"), ("m.txt", b"m"), ("a.txt", b"a")]);
        let overrides = overrides(&[("new/y.txt", b"y"), ("m.txt", b"M"), ("new/b.txt", b"b")]);
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::none());
        assert_eq!(plan.names().collect::<Vec<_>>(), ["m.txt", "new/b.txt", "new/y.txt", "z.txt", "a.txt"]);
    }

    #[test]
    fn test_signatures_excluded() {
        let base = base(&[
            ("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\n"),
            ("META-INF/CERT.SF", b"sig"),
            ("META-INF/CERT.RSA", b"key"),
            ("x.class", b"x"),
        ]);
        let overrides = OverrideSet::new();
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::signatures());

        assert_eq!(plan.names().collect::<Vec<_>>(), ["META-INF/MANIFEST.MF", "x.class"]);
        assert_eq!(plan.excluded(), ["META-INF/CERT.SF", "META-INF/CERT.RSA"]);
    }

    #[test]
    fn test_override_matching_exclusion_is_kept() {
        let base = base(&[("META-INF/CERT.SF", b"old")]);
        let overrides = overrides(&[("META-INF/CERT.SF", b"new")]);
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::signatures());
        assert_eq!(plan.names().collect::<Vec<_>>(), ["META-INF/CERT.SF"]);
        assert_eq!(merged(&plan).get("META-INF/CERT.SF").unwrap().read().unwrap(), b"new");
    }

    #[test]
    fn test_empty_overrides_preserve_base() {
        let base = base(&[("b.txt", b"b"), ("a.txt", b"a")]);
        let overrides = OverrideSet::new();
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::none());
        let out = merged(&plan);

        let originals = base.entries().map(|entry| (entry.name(), entry.raw_payload())).collect::<Vec<_>>();
        let copies = out.entries().map(|entry| (entry.name(), entry.raw_payload())).collect::<Vec<_>>();
        assert_eq!(originals, copies);
    }

    #[test]
    fn test_empty_base() {
        let base = base(&[]);
        let overrides = overrides(&[("only.txt", b"only")]);
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::none());
        assert_eq!(merged(&plan).len(), 1);
    }

    #[test]
    fn test_report() {
        let base = base(&[("a", b"1"), ("b", b"2"), ("META-INF/X.DSA", b"3")]);
        let overrides = overrides(&[("a", b"9"), ("c", b"8")]);
        let report = MergePlan::new(&base, &overrides, &ExcludePatterns::signatures()).report();
        assert_eq!(
            report,
            MergeReport {
                overrides: 2,
                preserved: 1,
                replaced: vec!["a".to_string()],
                excluded: vec!["META-INF/X.DSA".to_string()],
                duplicates: 0,
            }
        );
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_deterministic() {
        let base = base(&[("a", b"1"), ("b", b"2")]);
        let overrides = OverrideSet::from_entries([ArchiveEntry::new("c", b"3".repeat(64))
            .unwrap()
            .with_compression(Compression::Bzip2)])
        .unwrap();
        let first = MergePlan::new(&base, &overrides, &ExcludePatterns::none()).write_to(Vec::new()).unwrap();
        let second = MergePlan::new(&base, &overrides, &ExcludePatterns::none()).write_to(Vec::new()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_legacy_names_are_not_duplicates() {
        let mut writer = ArchiveWriter::new(Vec::new());
        for (name, payload) in [("cafX.txt", b"one"), ("cafY.txt", b"two")] {
            writer.add(&ArchiveEntry::new(name, payload.to_vec()).unwrap()).unwrap();
        }
        let mut bytes = writer.finish().unwrap();
        // Swap the ASCII placeholder for CP437 bytes in both headers of each entry.
        for (placeholder, byte) in [(b'X', 0x82), (b'Y', 0x83)] {
            let needle = [b'c', b'a', b'f', placeholder];
            let positions: Vec<usize> =
                bytes.windows(4).enumerate().filter(|(_, w)| *w == needle).map(|(pos, _)| pos).collect();
            for pos in positions {
                bytes[pos + 3] = byte;
            }
        }
        let base = BaseArchive::from_bytes(bytes).unwrap();
        let overrides = OverrideSet::new();
        let plan = MergePlan::new(&base, &overrides, &ExcludePatterns::none());

        assert!(plan.duplicates().is_empty());
        let out = merged(&plan);
        assert_eq!(out.len(), 2);
        let raw = |archive: &BaseArchive| archive.entries().map(|entry| entry.raw_payload().to_vec()).collect::<Vec<_>>();
        assert_eq!(raw(&out), raw(&base));
    }

    #[test]
    fn test_closure_exclusion() {
        let base = base(&[("keep.txt", b"k"), ("drop.log", b"d")]);
        let overrides = OverrideSet::new();
        let plan = MergePlan::new(&base, &overrides, &|name: &str| name.ends_with(".log"));
        assert_eq!(plan.names().collect::<Vec<_>>(), ["keep.txt"]);
    }
}
