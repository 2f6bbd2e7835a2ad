use super::{load_with, Loaded};
use crate::{ExpectedVerdict, HarnessError};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use verdict_util::resolve_relative;

/// A `fixtures.toml` file: the authoritative list of fixtures and their verdicts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(rename = "fixture", default)]
    pub fixtures: Vec<ManifestEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Defaults to `path`.
    pub name: Option<String>,
    /// Relative to the directory holding the manifest.
    pub path: PathBuf,
    pub expected: ExpectedVerdict,
    pub entry: Option<String>,
}

impl ManifestEntry {
    pub fn identifier(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.path.to_string_lossy().replace('\\', "/"),
        }
    }
}

impl Manifest {
    /// Read and parse a manifest. Failure here is fatal for the whole manifest.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read manifest {}: {}", path.display(), e))?;
        Self::from_str(&text).with_context(|| format!("failed to parse manifest {}", path.display()))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(text: &str) -> anyhow::Result<Self> {
        let manifest: Self = toml::from_str(text)?;
        Ok(manifest)
    }

    /// Load every entry, resolving paths against `manifest_dir`.
    ///
    /// Entries fail independently; a repeated identifier fails every occurrence
    /// after the first.
    pub fn load(&self, manifest_dir: &Path) -> Vec<Loaded> {
        let mut seen = HashSet::new();
        self.fixtures
            .iter()
            .map(|entry| {
                let identifier = entry.identifier();
                if !seen.insert(identifier.clone()) {
                    return Err(HarnessError::malformed(
                        identifier,
                        "identifier already used by an earlier manifest entry",
                    ));
                }
                let path = resolve_relative(manifest_dir, &entry.path);
                tracing::debug!("manifest: {} -> {}", identifier, path.display());
                load_with(identifier, &path, entry.expected, entry.entry.as_deref())
            })
            .collect()
    }

    /// Canonical paths of the entries that exist on disk.
    pub fn covered_paths(&self, manifest_dir: &Path) -> HashSet<PathBuf> {
        self.fixtures
            .iter()
            .filter_map(|entry| std::fs::canonicalize(resolve_relative(manifest_dir, &entry.path)).ok())
            .collect()
    }
}
