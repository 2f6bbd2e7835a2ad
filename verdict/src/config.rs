//! `Verdict.toml`: defaults for the command line.
//!
//! ```toml
//! [run]
//! timeout = "60s"
//! jobs = 4
//!
//! [fixtures]
//! manifest = "fixtures.toml"
//! paths = ["programs"]
//!
//! [checker]
//! program = "scripts/cpa.sh"
//! args = ["-default", "-entryfunction", "{entry}", "{file}"]
//! ```
//!
//! Relative paths are resolved against the directory holding the file.

use crate::cli::shared::{check_timeout, parse_duration, OutputFormat};
use anyhow::{anyhow, Context, Result};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use verdict_test::ProcessCheckerConfig;
use verdict_util::{find_config_dir, resolve_relative, CONFIG_FILE_NAME};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerdictConfig {
    #[serde(default)]
    pub run: RunTable,
    #[serde(default)]
    pub fixtures: FixturesTable,
    pub checker: Option<ProcessCheckerConfig>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunTable {
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub timeout: Option<Duration>,
    pub jobs: Option<usize>,
    pub format: Option<OutputFormat>,
    pub log: Option<PathBuf>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FixturesTable {
    pub manifest: Option<PathBuf>,
    #[serde(default)]
    pub paths: Vec<PathBuf>,
    #[serde(default)]
    pub extensions: Vec<String>,
}

/// A config file together with the directory it was found in.
#[derive(Clone, Debug)]
pub struct LoadedConfig {
    pub dir: PathBuf,
    pub config: VerdictConfig,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(u64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawDuration>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawDuration::Seconds(secs)) => check_timeout(Duration::from_secs(secs))
            .map(Some)
            .map_err(de::Error::custom),
        Some(RawDuration::Text(text)) => parse_duration(&text).map(Some).map_err(de::Error::custom),
    }
}

impl VerdictConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config {}: {}", path.display(), e))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Make every relative path absolute against `dir`.
    ///
    /// A checker `program` without a directory part is left alone so it is looked up
    /// on `PATH`.
    pub fn resolve_paths(mut self, dir: &Path) -> Self {
        self.run.log = self.run.log.map(|log| resolve_relative(dir, &log));
        self.fixtures.manifest = self
            .fixtures
            .manifest
            .map(|manifest| resolve_relative(dir, &manifest));
        self.fixtures.paths = self
            .fixtures
            .paths
            .iter()
            .map(|path| resolve_relative(dir, path))
            .collect();
        if let Some(checker) = &mut self.checker {
            if checker.program.components().count() > 1 {
                checker.program = resolve_relative(dir, &checker.program);
            }
        }
        self
    }
}

impl LoadedConfig {
    /// Load the config named by `--config`, or else the nearest `Verdict.toml` at or
    /// above `cwd`. Having no config file at all is fine.
    pub fn find(explicit: Option<&Path>, cwd: &Path) -> Result<Option<Self>> {
        let path = match explicit {
            Some(path) => resolve_relative(cwd, path),
            None => match find_config_dir(cwd) {
                Some(dir) => dir.join(CONFIG_FILE_NAME),
                None => return Ok(None),
            },
        };
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.to_path_buf());
        tracing::debug!("using config {}", path.display());
        let config = VerdictConfig::from_file(&path)?.resolve_paths(&dir);
        Ok(Some(Self { dir, config }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FULL: &str = r#"
[run]
timeout = "90s"
jobs = 4
format = "json"
log = "results.jsonl"

[fixtures]
manifest = "fixtures.toml"
paths = ["programs"]
extensions = ["c"]

[checker]
program = "scripts/cpa.sh"
args = ["-default", "-entryfunction", "{entry}", "{file}"]
retries = 1
env = { JAVA_HEAP_SIZE = "2g" }
"#;

    #[test]
    fn parses_every_table() {
        let config: VerdictConfig = toml::from_str(FULL).unwrap();
        assert_eq!(config.run.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.run.jobs, Some(4));
        assert_eq!(config.run.format, Some(OutputFormat::Json));
        assert_eq!(config.fixtures.paths, vec![PathBuf::from("programs")]);
        let checker = config.checker.unwrap();
        assert_eq!(checker.retries, 1);
        assert_eq!(checker.env["JAVA_HEAP_SIZE"], "2g");
        assert_eq!(
            checker.unsafe_pattern,
            verdict_test::checker::process::DEFAULT_UNSAFE_PATTERN
        );
    }

    #[test]
    fn bare_number_timeout_is_seconds() {
        let config: VerdictConfig = toml::from_str("[run]\ntimeout = 5\n").unwrap();
        assert_eq!(config.run.timeout, Some(Duration::from_secs(5)));
        assert!(toml::from_str::<VerdictConfig>("[run]\ntimeout = 0\n").is_err());
        assert!(toml::from_str::<VerdictConfig>("[run]\ntimeout = 604801\n").is_err());
        assert!(toml::from_str::<VerdictConfig>("[run]\ntimeout = \"20000m\"\n").is_err());
        assert!(toml::from_str::<VerdictConfig>("[run]\ntimeout = \"soon\"\n").is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<VerdictConfig>("[run]\nparallel = true\n").is_err());
        assert!(toml::from_str::<VerdictConfig>("[reporting]\n").is_err());
    }

    #[test]
    fn relative_paths_resolve_against_the_config_dir() {
        let config: VerdictConfig = toml::from_str(FULL).unwrap();
        let dir = Path::new("/corpus");
        let config = config.resolve_paths(dir);
        assert_eq!(config.run.log, Some(dir.join("results.jsonl")));
        assert_eq!(config.fixtures.manifest, Some(dir.join("fixtures.toml")));
        assert_eq!(config.fixtures.paths, vec![dir.join("programs")]);
        assert_eq!(
            config.checker.unwrap().program,
            dir.join("scripts").join("cpa.sh")
        );

        let bare: VerdictConfig = toml::from_str("[checker]\nprogram = \"cpa.sh\"\n").unwrap();
        assert_eq!(
            bare.resolve_paths(dir).checker.unwrap().program,
            PathBuf::from("cpa.sh")
        );
    }

    #[test]
    fn config_is_found_upwards() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("programs").join("loops");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "[run]\njobs = 2\n").unwrap();

        let loaded = LoadedConfig::find(None, &nested).unwrap().unwrap();
        assert_eq!(loaded.config.run.jobs, Some(2));
        assert_eq!(loaded.dir, std::fs::canonicalize(dir.path()).unwrap());
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let err = LoadedConfig::find(Some(Path::new("missing.toml")), dir.path()).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
