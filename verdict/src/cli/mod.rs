use crate::ExitCode;
use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
pub mod shared;

use self::commands::{list, run};

pub use list::Command as ListCommand;
pub use run::Command as RunCommand;

#[derive(Debug, Parser)]
#[clap(name = "verdict", about = "Verification fixture harness", version)]
struct Opt {
    /// The command to run
    #[clap(subcommand)]
    command: Verdict,
}

#[derive(Debug, Subcommand)]
enum Verdict {
    Run(RunCommand),
    List(ListCommand),
}

pub async fn run_cli() -> Result<ExitCode> {
    let opt = Opt::parse();
    match opt.command {
        Verdict::Run(command) => run::exec(command).await,
        Verdict::List(command) => list::exec(command),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Opt::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let opt = Opt::try_parse_from([
            "verdict",
            "run",
            "loops/",
            "--path",
            "programs",
            "--path",
            "more",
            "--skip",
            "cil",
            "--timeout",
            "500ms",
            "--jobs",
            "4",
            "--format",
            "json",
            "-vv",
        ])
        .unwrap();
        let Verdict::Run(cmd) = opt.command else {
            panic!("expected `run`");
        };
        assert_eq!(
            cmd.fixtures.filter.as_ref().map(|re| re.as_str()),
            Some("loops/")
        );
        assert_eq!(cmd.fixtures.skip.as_ref().map(|re| re.as_str()), Some("cil"));
        assert_eq!(cmd.fixtures.path.len(), 2);
        assert_eq!(cmd.timeout, Some(std::time::Duration::from_millis(500)));
        assert_eq!(cmd.jobs, Some(4));
        assert_eq!(cmd.format, Some(shared::OutputFormat::Json));
        assert_eq!(cmd.verbose, 2);
    }

    #[test]
    fn bad_timeout_and_regex_are_rejected() {
        assert!(Opt::try_parse_from(["verdict", "run", "--timeout", "soon"]).is_err());
        assert!(Opt::try_parse_from(["verdict", "list", "--skip", "("]).is_err());
    }
}
