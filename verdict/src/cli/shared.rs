//! Arguments and parsers shared between commands.

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use verdict_test::MAX_TIMEOUT;

/// Which fixtures to work on.
#[derive(Args, Debug, Default)]
pub struct Fixtures {
    /// Only fixtures whose identifier matches this regex are used.
    #[clap(value_parser)]
    pub filter: Option<regex::Regex>,
    /// A fixture file or a directory to search for fixtures. May be repeated.
    ///
    /// Overrides `[fixtures] paths` in `Verdict.toml`.
    #[clap(long)]
    pub path: Vec<PathBuf>,
    /// A `fixtures.toml` listing fixtures and their expected verdicts.
    #[clap(long)]
    pub manifest: Option<PathBuf>,
    /// Fixtures whose identifier matches this regex are skipped.
    #[clap(long)]
    pub skip: Option<regex::Regex>,
    /// Path to a `Verdict.toml`. By default it is searched for upwards from the
    /// current directory.
    #[clap(long)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One line per fixture and a summary.
    #[default]
    Human,
    /// A single JSON document on stdout.
    Json,
}

/// Parse `500ms`, `30s`, `2m` or a bare number of seconds, up to a week.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let digits = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (number, unit) = s.split_at(digits);
    let number: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration `{s}`, expected e.g. `500ms`, `30s` or `2m`"))?;
    let duration = match unit.trim() {
        "ms" => Duration::from_millis(number),
        "" | "s" => Duration::from_secs(number),
        "m" => Duration::from_secs(number.saturating_mul(60)),
        other => return Err(format!("unknown unit `{other}` in duration `{s}`")),
    };
    check_timeout(duration)
}

/// Reject timeouts of zero or longer than [`MAX_TIMEOUT`].
pub fn check_timeout(duration: Duration) -> Result<Duration, String> {
    if duration.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    if duration > MAX_TIMEOUT {
        return Err(format!(
            "duration must be at most {}s",
            MAX_TIMEOUT.as_secs()
        ));
    }
    Ok(duration)
}
