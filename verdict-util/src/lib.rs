//! Utility items shared between verdict crates.

use std::path::{Component, Path, PathBuf};

pub mod results_log;

pub use results_log::ResultsLog;

/// The harness configuration file looked up from the working directory.
pub const CONFIG_FILE_NAME: &str = "Verdict.toml";
/// The conventional name of a fixture manifest.
pub const MANIFEST_FILE_NAME: &str = "fixtures.toml";

/// Continually go up in the file tree until a specified file is found.
pub fn find_parent_dir_with_file(starter_path: &Path, file_name: &str) -> Option<PathBuf> {
    let mut path = std::fs::canonicalize(starter_path).ok()?;
    loop {
        path.push(file_name);
        if path.is_file() {
            path.pop();
            return Some(path);
        }
        path.pop();
        if !path.pop() {
            return None;
        }
    }
}

/// Continually go up in the file tree until a `Verdict.toml` is found.
pub fn find_config_dir(starter_path: &Path) -> Option<PathBuf> {
    find_parent_dir_with_file(starter_path, CONFIG_FILE_NAME)
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Render `path` relative to `root` with `/` separators, for use as a stable name.
///
/// Falls back to the full path when `path` does not live under `root`.
pub fn slash_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            Component::RootDir => Some(String::new()),
            Component::CurDir | Component::Prefix(_) => None,
        })
        .collect();
    parts.join("/")
}
