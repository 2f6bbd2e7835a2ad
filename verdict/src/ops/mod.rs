pub mod verdict_list;
pub mod verdict_run;

use crate::{cli::shared, config::LoadedConfig};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use verdict_test::{FixtureFilter, FixtureSources, Loaded};
use verdict_util::{resolve_relative, MANIFEST_FILE_NAME};

/// Work out where fixtures come from.
///
/// Command-line paths and manifest win over the config file. With neither, a
/// `fixtures.toml` in `cwd` is used if there is one, and otherwise `cwd` is searched.
pub(crate) fn fixture_sources(
    fixtures: &shared::Fixtures,
    config: Option<&LoadedConfig>,
    cwd: &Path,
) -> FixtureSources {
    let table = config.map(|loaded| &loaded.config.fixtures);
    let manifest = fixtures
        .manifest
        .as_ref()
        .map(|manifest| resolve_relative(cwd, manifest))
        .or_else(|| table.and_then(|table| table.manifest.clone()));
    let extensions = table
        .map(|table| table.extensions.clone())
        .unwrap_or_default();

    let (base, paths) = if !fixtures.path.is_empty() {
        (cwd.to_path_buf(), fixtures.path.clone())
    } else if let Some(loaded) = config.filter(|loaded| !loaded.config.fixtures.paths.is_empty()) {
        (loaded.dir.clone(), loaded.config.fixtures.paths.clone())
    } else {
        (cwd.to_path_buf(), vec![])
    };

    let mut sources = FixtureSources {
        manifest,
        paths,
        base,
        extensions,
    };
    if sources.manifest.is_none() && sources.paths.is_empty() {
        let default_manifest = cwd.join(MANIFEST_FILE_NAME);
        if default_manifest.is_file() {
            sources.manifest = Some(default_manifest);
        } else {
            sources.paths = vec![PathBuf::from(".")];
        }
    }
    sources
}

/// Load the config file, if any, as seen from the working directory.
pub(crate) fn load_config(fixtures: &shared::Fixtures) -> Result<(PathBuf, Option<LoadedConfig>)> {
    let cwd = std::env::current_dir().context("failed to read the current directory")?;
    let config = LoadedConfig::find(fixtures.config.as_deref(), &cwd)?;
    Ok((cwd, config))
}

/// Load every selected fixture. Only an unusable manifest is an error.
pub(crate) fn load_fixtures(
    fixtures: &shared::Fixtures,
    config: Option<&LoadedConfig>,
    cwd: &Path,
) -> Result<Vec<Loaded>> {
    let filter = FixtureFilter {
        include: fixtures.filter.clone(),
        skip: fixtures.skip.clone(),
    };
    let sources = fixture_sources(fixtures, config, cwd);
    let loaded = sources
        .load()?
        .into_iter()
        .filter(|loaded| filter.matches(identifier(loaded)))
        .collect();
    Ok(loaded)
}

pub(crate) fn identifier(loaded: &Loaded) -> &str {
    match loaded {
        Ok(case) => case.identifier(),
        Err(err) => err.identifier(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerdictConfig;
    use pretty_assertions::assert_eq;

    fn loaded(toml: &str, dir: &Path) -> LoadedConfig {
        let config: VerdictConfig = toml::from_str(toml).unwrap();
        LoadedConfig {
            dir: dir.to_path_buf(),
            config: config.resolve_paths(dir),
        }
    }

    #[test]
    fn command_line_paths_win() {
        let config = loaded("[fixtures]\npaths = [\"programs\"]\n", Path::new("/corpus"));
        let fixtures = shared::Fixtures {
            path: vec![PathBuf::from("mine")],
            ..Default::default()
        };
        let sources = fixture_sources(&fixtures, Some(&config), Path::new("/work"));
        assert_eq!(sources.base, PathBuf::from("/work"));
        assert_eq!(sources.paths, vec![PathBuf::from("mine")]);
    }

    #[test]
    fn config_paths_are_relative_to_the_config() {
        let config = loaded(
            "[fixtures]\nmanifest = \"fixtures.toml\"\npaths = [\"programs\"]\n",
            Path::new("/corpus"),
        );
        let sources = fixture_sources(&shared::Fixtures::default(), Some(&config), Path::new("/work"));
        assert_eq!(sources.base, PathBuf::from("/corpus"));
        assert_eq!(sources.paths, vec![PathBuf::from("/corpus/programs")]);
        assert_eq!(sources.manifest, Some(PathBuf::from("/corpus/fixtures.toml")));
    }

    #[test]
    fn defaults_to_searching_the_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sources = fixture_sources(&shared::Fixtures::default(), None, dir.path());
        assert_eq!(sources.paths, vec![PathBuf::from(".")]);
        assert!(sources.manifest.is_none());

        std::fs::write(dir.path().join(MANIFEST_FILE_NAME), "").unwrap();
        let sources = fixture_sources(&shared::Fixtures::default(), None, dir.path());
        assert_eq!(sources.manifest, Some(dir.path().join(MANIFEST_FILE_NAME)));
        assert!(sources.paths.is_empty());
    }
}
