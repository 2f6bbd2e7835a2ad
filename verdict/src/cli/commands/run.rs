use crate::{
    cli::shared::{self, OutputFormat},
    ops::verdict_run,
    ExitCode,
};
use anyhow::Result;
use clap::Parser;
use std::{path::PathBuf, time::Duration};

/// Run fixtures through the configured checker and judge its verdicts.
///
/// Each fixture's expected verdict comes from its manifest entry or, failing that,
/// from its file name (`_false_`/`_unsafe_` mean UNSAFE, `_true_`/`_safe_` mean SAFE).
/// The checker is configured in the `[checker]` table of `Verdict.toml`.
///
/// Exits with 0 when every fixture passed, 1 when a checker gave a wrong verdict, 2 on
/// a usage or configuration error and 3 when a fixture could not be loaded or the
/// checker gave no verdict.
#[derive(Debug, Parser)]
pub struct Command {
    #[clap(flatten)]
    pub fixtures: shared::Fixtures,
    /// How long the checker may spend on one fixture, e.g. `500ms`, `30s` or `2m`, up
    /// to a week.
    /// [default: 60s]
    #[clap(long, value_parser = shared::parse_duration)]
    pub timeout: Option<Duration>,
    /// Number of fixtures checked at once. Defaults to the number of CPUs.
    #[clap(long, short = 'j')]
    pub jobs: Option<usize>,
    /// Output format.
    #[clap(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Append one JSON record per fixture to this file.
    #[clap(long)]
    pub log: Option<PathBuf>,
    /// Use verbose output (-vv for very verbose).
    #[clap(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
    /// Silence all output. The exit code still reports the result.
    #[clap(short, long)]
    pub silent: bool,
}

pub(crate) async fn exec(command: Command) -> Result<ExitCode> {
    verdict_run::run(command).await
}
