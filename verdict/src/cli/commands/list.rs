use crate::{cli::shared, ops::verdict_list, ExitCode};
use anyhow::Result;
use clap::Parser;

/// List the fixtures a `run` would check, with their expected verdicts.
///
/// Fixtures that fail to load are listed with the reason, and make the command exit
/// with 3.
#[derive(Debug, Parser)]
pub struct Command {
    #[clap(flatten)]
    pub fixtures: shared::Fixtures,
}

pub(crate) fn exec(command: Command) -> Result<ExitCode> {
    verdict_list::list(command)
}
