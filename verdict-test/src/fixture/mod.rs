//! Loading fixtures from disk.
//!
//! A fixture is a program file handed to the checker verbatim. Its expected verdict
//! comes from a manifest entry when one exists, and otherwise from the file name.

pub mod convention;
pub mod manifest;

use crate::{ExpectedVerdict, HarnessError};
use std::{
    collections::HashSet,
    io,
    path::{Path, PathBuf},
    sync::Arc,
};
use verdict_util::slash_path;
use walkdir::WalkDir;

pub use manifest::{Manifest, ManifestEntry};

/// Entry point used when a fixture does not name one.
pub const DEFAULT_ENTRY_POINT: &str = "main";
/// Extensions picked up when walking a directory.
pub const DEFAULT_EXTENSIONS: &[&str] = &["c", "i"];

/// A fixture that loaded, or the reason it did not.
pub type Loaded = Result<TestCase, HarnessError>;

/// A program fragment together with the verdict its author expects.
///
/// The source text is shared and never changes once loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    identifier: String,
    source_text: Arc<str>,
    entry_point: String,
    expected: ExpectedVerdict,
    path: Option<PathBuf>,
}

impl TestCase {
    pub fn new(
        identifier: impl Into<String>,
        source_text: impl Into<Arc<str>>,
        expected: ExpectedVerdict,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            source_text: source_text.into(),
            entry_point: DEFAULT_ENTRY_POINT.to_string(),
            expected,
            path: None,
        }
    }

    pub fn with_entry_point(mut self, entry_point: impl Into<String>) -> Self {
        self.entry_point = entry_point.into();
        self
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn source_text(&self) -> &Arc<str> {
        &self.source_text
    }

    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn expected(&self) -> ExpectedVerdict {
        self.expected
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The name given to the copy of the source handed to the checker.
    ///
    /// Keeps the original file name so checkers that dispatch on extension (`.i`,
    /// `.cil.c`) see what the author wrote.
    pub fn file_name(&self) -> String {
        self.path
            .as_deref()
            .and_then(Path::file_name)
            .or_else(|| Path::new(&self.identifier).file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "fixture.c".to_string())
    }
}

/// Load the fixture at `path`, reading its expected verdict from the file name.
pub fn load_fixture(identifier: impl Into<String>, path: &Path) -> Loaded {
    let identifier = identifier.into();
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    // A missing file is reported as such before the name is judged.
    let source_text = read_source(&identifier, path)?;
    let expected = convention::expected_from_file_name(&file_name)
        .map_err(|reason| HarnessError::malformed(&identifier, reason))?;
    Ok(TestCase::new(identifier, source_text, expected).with_path(path))
}

/// Load the fixture at `path` with an expected verdict supplied by the caller.
pub fn load_with(
    identifier: impl Into<String>,
    path: &Path,
    expected: ExpectedVerdict,
    entry_point: Option<&str>,
) -> Loaded {
    let identifier = identifier.into();
    let source_text = read_source(&identifier, path)?;
    let case = TestCase::new(identifier, source_text, expected).with_path(path);
    Ok(match entry_point {
        Some(entry_point) => case.with_entry_point(entry_point),
        None => case,
    })
}

fn read_source(identifier: &str, path: &Path) -> Result<Arc<str>, HarnessError> {
    let bytes = std::fs::read(path).map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => HarnessError::NotFound {
            identifier: identifier.to_string(),
            path: path.to_path_buf(),
        },
        _ => HarnessError::malformed(identifier, format!("failed to read: {err}")),
    })?;
    let text = String::from_utf8(bytes).map_err(|err| {
        HarnessError::malformed(
            identifier,
            format!("not valid UTF-8 at byte {}", err.utf8_error().valid_up_to()),
        )
    })?;
    if text.is_empty() {
        return Err(HarnessError::malformed(identifier, "empty program text"));
    }
    Ok(Arc::from(text))
}

/// All files under `root` whose extension is one of `extensions`, in sorted order.
pub fn discover(root: &Path, extensions: &[String]) -> Vec<walkdir::Result<PathBuf>> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && has_extension(entry.path(), extensions) => {
                Some(Ok(entry.into_path()))
            }
            Ok(_) => None,
            Err(err) => Some(Err(err)),
        })
        .collect()
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Load every fixture named by `paths`, reading expected verdicts from file names.
///
/// Directories are walked for files with one of `extensions`. Relative paths resolve
/// against `base`, and identifiers are the fixture paths relative to `base`. Files in
/// `exclude` are skipped; the manifest passes in the files it already covers.
pub fn load_paths(
    base: &Path,
    paths: &[PathBuf],
    extensions: &[String],
    exclude: &HashSet<PathBuf>,
) -> Vec<Loaded> {
    let mut loaded = vec![];
    for path in paths {
        let resolved = verdict_util::resolve_relative(base, path);
        if resolved.is_dir() {
            for found in discover(&resolved, extensions) {
                match found {
                    Ok(file) => {
                        if !is_excluded(&file, exclude) {
                            loaded.push(load_fixture(slash_path(base, &file), &file));
                        }
                    }
                    Err(err) => {
                        let at = err.path().unwrap_or(&resolved);
                        loaded.push(Err(HarnessError::malformed(
                            slash_path(base, at),
                            format!("failed to walk directory: {err}"),
                        )));
                    }
                }
            }
        } else if !is_excluded(&resolved, exclude) {
            loaded.push(load_fixture(slash_path(base, &resolved), &resolved));
        }
    }
    loaded
}

fn is_excluded(path: &Path, exclude: &HashSet<PathBuf>) -> bool {
    !exclude.is_empty()
        && std::fs::canonicalize(path)
            .map(|canonical| exclude.contains(&canonical))
            .unwrap_or(false)
}

/// Where fixtures come from for one run.
#[derive(Clone, Debug, Default)]
pub struct FixtureSources {
    /// A manifest file; its entries take authority over file names.
    pub manifest: Option<PathBuf>,
    /// Files and directories to load by file-name convention.
    pub paths: Vec<PathBuf>,
    /// Base directory for relative `paths` and for their identifiers.
    pub base: PathBuf,
    pub extensions: Vec<String>,
}

impl FixtureSources {
    /// Load the manifest entries first, then every path not already covered by one.
    ///
    /// Only a manifest that cannot be read or parsed is an error; every per-fixture
    /// problem is returned in place of that fixture.
    pub fn load(&self) -> anyhow::Result<Vec<Loaded>> {
        let mut loaded = vec![];
        let mut covered = HashSet::new();
        if let Some(manifest_path) = &self.manifest {
            let manifest = Manifest::from_file(manifest_path)?;
            let manifest_dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));
            covered = manifest.covered_paths(manifest_dir);
            loaded.extend(manifest.load(manifest_dir));
        }
        let extensions = if self.extensions.is_empty() {
            DEFAULT_EXTENSIONS.iter().map(ToString::to_string).collect()
        } else {
            self.extensions.clone()
        };
        loaded.extend(load_paths(&self.base, &self.paths, &extensions, &covered));
        Ok(loaded)
    }
}
