use rstest::{fixture, rstest};
use splice_archive::BaseArchive;
use splice_overlay::error::ErrorKind;
use splice_overlay::{Artifact, EntryOptions, ExcludePatterns, OverrideSet, merge_into};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn classes(&self, files: &[(&str, &[u8])]) -> PathBuf {
        let root = self.dir.path().join("classes");
        for (name, contents) in files {
            let path = root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        fs::create_dir_all(&root).unwrap();
        root
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("build/libs/clojure.jar")
    }
}

#[fixture]
fn workspace() -> Workspace {
    Workspace { dir: TempDir::new().unwrap() }
}

fn merge(base: &Path, classes: &Path, output: &Path) -> splice_overlay::error::Result<splice_overlay::MergeReport> {
    let overrides = OverrideSet::from_dirs(&[classes], EntryOptions::default())?;
    merge_into(base, &overrides, &ExcludePatterns::signatures(), &Artifact::new(output))
}

#[rstest]
fn replaces_classes_and_strips_signatures(workspace: Workspace) {
    let classes = workspace.classes(&[("clojure/lang/RT.class", b"\xca\xfe\xba\xbe patched RT")]);
    let report = merge(&fixture_path("stock.jar"), &classes, &workspace.output()).unwrap();

    assert_eq!(report.replaced, ["clojure/lang/RT.class"]);
    assert_eq!(report.excluded, ["META-INF/CLOJURE.SF", "META-INF/CLOJURE.RSA"]);

    let merged = BaseArchive::open(workspace.output()).unwrap();
    assert_eq!(
        merged.entries().map(|entry| entry.name()).collect::<Vec<_>>(),
        [
            "clojure/lang/RT.class",
            "META-INF/MANIFEST.MF",
            "clojure/",
            "clojure/lang/Compiler.class",
            "clojure/core.clj",
        ]
    );
    assert_eq!(merged.get("clojure/lang/RT.class").unwrap().read().unwrap(), b"\xca\xfe\xba\xbe patched RT");
    assert_eq!(merged.comment(), b"stock build");
}

#[rstest]
fn base_entries_are_copied_verbatim(workspace: Workspace) {
    let classes = workspace.classes(&[("clojure/lang/RT.class", b"patched")]);
    merge(&fixture_path("stock.jar"), &classes, &workspace.output()).unwrap();

    let stock = BaseArchive::open(fixture_path("stock.jar")).unwrap();
    let merged = BaseArchive::open(workspace.output()).unwrap();
    for name in ["META-INF/MANIFEST.MF", "clojure/lang/Compiler.class", "clojure/core.clj"] {
        let before = stock.get(name).unwrap();
        let after = merged.get(name).unwrap();
        assert_eq!(before.raw_payload(), after.raw_payload(), "{name}");
        assert_eq!(before.method(), after.method(), "{name}");
        assert_eq!(before.crc32(), after.crc32(), "{name}");
        assert_eq!(before.modified(), after.modified(), "{name}");
        assert_eq!(after.read().unwrap(), before.read().unwrap(), "{name}");
    }
}

#[rstest]
fn new_entries_are_added(workspace: Workspace) {
    let classes = workspace.classes(&[("clojure/lang/Patched$Helper.class", b"helper")]);
    let report = merge(&fixture_path("stock.jar"), &classes, &workspace.output()).unwrap();

    assert!(report.replaced.is_empty());
    assert_eq!(report.overrides, 1);
    let merged = BaseArchive::open(workspace.output()).unwrap();
    assert_eq!(merged.len(), 6);
    assert_eq!(merged.get("clojure/lang/Patched$Helper.class").unwrap().read().unwrap(), b"helper");
}

#[rstest]
fn output_is_deterministic(workspace: Workspace) {
    let classes = workspace.classes(&[("clojure/lang/RT.class", b"patched"), ("extra/a.txt", b"a")]);
    let second = workspace.dir.path().join("second.jar");
    merge(&fixture_path("stock.jar"), &classes, &workspace.output()).unwrap();
    merge(&fixture_path("stock.jar"), &classes, &second).unwrap();
    assert_eq!(fs::read(workspace.output()).unwrap(), fs::read(second).unwrap());
}

#[rstest]
fn merging_onto_itself_is_stable(workspace: Workspace) {
    let classes = workspace.classes(&[("clojure/lang/RT.class", b"patched")]);
    merge(&fixture_path("stock.jar"), &classes, &workspace.output()).unwrap();
    let first = fs::read(workspace.output()).unwrap();

    // The output is its own base now: same overrides, same bytes.
    merge(&workspace.output(), &classes, &workspace.output()).unwrap();
    assert_eq!(fs::read(workspace.output()).unwrap(), first);
}

#[rstest]
fn repeated_base_entries_keep_the_first(workspace: Workspace) {
    let classes = workspace.classes(&[]);
    let report = merge(&fixture_path("duplicates.zip"), &classes, &workspace.output()).unwrap();

    assert_eq!(report.duplicates, 1);
    let merged = BaseArchive::open(workspace.output()).unwrap();
    assert_eq!(merged.entries().map(|entry| entry.name()).collect::<Vec<_>>(), ["a.txt", "b.txt"]);
    assert_eq!(merged.get("a.txt").unwrap().read().unwrap(), b"first");
}

#[rstest]
fn corrupt_base_leaves_no_output(workspace: Workspace) {
    let base = workspace.dir.path().join("broken.jar");
    fs::write(&base, b"definitely not a zip file").unwrap();
    let classes = workspace.classes(&[("a.class", b"a")]);

    let err = merge(&base, &classes, &workspace.output()).unwrap_err();
    assert!(matches!(&*err, ErrorKind::CorruptArchive(path) if *path == base));
    assert!(!workspace.output().exists());
}

#[rstest]
fn missing_base_is_reported_as_corrupt(workspace: Workspace) {
    let base = workspace.dir.path().join("absent.jar");
    let classes = workspace.classes(&[]);
    let err = merge(&base, &classes, &workspace.output()).unwrap_err();
    assert!(matches!(&*err, ErrorKind::CorruptArchive(_)));
}

#[rstest]
fn missing_override_directory(workspace: Workspace) {
    let missing = workspace.dir.path().join("no-such-classes");
    let err = merge(&fixture_path("stock.jar"), &missing, &workspace.output()).unwrap_err();
    assert!(matches!(&*err, ErrorKind::MissingOverrideSource(path) if *path == missing));
    assert!(!workspace.output().exists());
}

#[rstest]
fn failed_merge_keeps_previous_output(workspace: Workspace) {
    let output = workspace.output();
    fs::create_dir_all(output.parent().unwrap()).unwrap();
    fs::write(&output, b"previous build").unwrap();

    let base = workspace.dir.path().join("broken.jar");
    fs::write(&base, b"PK\x05\x06 truncated").unwrap();
    let classes = workspace.classes(&[("a.class", b"a")]);
    assert!(merge(&base, &classes, &output).is_err());
    assert_eq!(fs::read(&output).unwrap(), b"previous build");
}

#[rstest]
fn unwritable_alias_leaves_no_output(workspace: Workspace) {
    let blocker = workspace.dir.path().join("not-a-directory");
    fs::write(&blocker, b"").unwrap();
    let classes = workspace.classes(&[("clojure/lang/RT.class", b"\xca\xfe\xba\xbe patched RT")]);
    let overrides = OverrideSet::from_dirs(&[&classes], EntryOptions::default()).unwrap();
    let artifact = Artifact::new(workspace.output()).with_alias(blocker.join("clojure.jar"));

    let err = merge_into(fixture_path("stock.jar"), &overrides, &ExcludePatterns::signatures(), &artifact).unwrap_err();
    assert!(matches!(&*err, ErrorKind::WriteFailure(_)));
    assert!(!workspace.output().exists());
}
