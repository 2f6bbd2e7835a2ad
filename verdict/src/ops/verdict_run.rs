use crate::{
    cli::{shared::OutputFormat, RunCommand},
    config::LoadedConfig,
    ExitCode,
};
use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::info;
use verdict_test::{
    self as vt, CaseStatus, Checker, Outcome, ProcessChecker, ProcessCheckerConfig,
    ResultRecord, RunOpts, Summary, TestRunnerCount, Tested,
};
use verdict_tracing::{
    eprintln_yellow, init_tracing_subscriber, println_yellow_err, LogOptions, LogStream,
};
use verdict_util::{resolve_relative, ResultsLog};

/// Number of trailing diagnostic lines shown for a failed fixture.
const DIAGNOSTIC_TAIL_LINES: usize = 10;

/// Everything `run` needs once flags and the config file are merged.
#[derive(Debug)]
pub struct RunSettings {
    pub timeout: Duration,
    pub runners: TestRunnerCount,
    pub format: OutputFormat,
    pub log: Option<PathBuf>,
    pub checker: ProcessCheckerConfig,
}

impl RunSettings {
    /// Flags win over `Verdict.toml`, which wins over the built-in defaults.
    pub fn resolve(command: &RunCommand, config: Option<&LoadedConfig>, cwd: &Path) -> Result<Self> {
        let run = config.map(|loaded| &loaded.config.run);
        let jobs = command.jobs.or_else(|| run.and_then(|run| run.jobs));
        let runners = match jobs {
            Some(0) => bail!("--jobs must be at least 1"),
            Some(jobs) => TestRunnerCount::Manual(jobs),
            None => TestRunnerCount::Auto,
        };
        let checker = config
            .and_then(|loaded| loaded.config.checker.clone())
            .ok_or_else(|| match config {
                Some(loaded) => anyhow!(
                    "no [checker] table in {}",
                    loaded.dir.join(verdict_util::CONFIG_FILE_NAME).display()
                ),
                None => anyhow!(
                    "no {} found; `verdict run` needs a [checker] table naming the checker program",
                    verdict_util::CONFIG_FILE_NAME
                ),
            })?;
        Ok(Self {
            timeout: command
                .timeout
                .or_else(|| run.and_then(|run| run.timeout))
                .unwrap_or(vt::DEFAULT_TIMEOUT),
            runners,
            format: command
                .format
                .or_else(|| run.and_then(|run| run.format))
                .unwrap_or_default(),
            log: command
                .log
                .as_ref()
                .map(|log| resolve_relative(cwd, log))
                .or_else(|| run.and_then(|run| run.log.clone())),
            checker,
        })
    }
}

/// One line of the results log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC 3339.
    pub recorded_at: String,
    pub checker: String,
    #[serde(flatten)]
    pub result: ResultRecord,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    checker: &'a str,
    outcome: Outcome,
    summary: Summary,
    results: Vec<ResultRecord>,
}

pub async fn run(command: RunCommand) -> Result<ExitCode> {
    let (cwd, config) = super::load_config(&command.fixtures)?;
    let settings = RunSettings::resolve(&command, config.as_ref(), &cwd)?;
    init_tracing_subscriber(LogOptions {
        verbosity: command.verbose,
        silent: command.silent,
        stream: match settings.format {
            OutputFormat::Human => LogStream::Split,
            OutputFormat::Json => LogStream::Stderr,
        },
    });

    let cases = super::load_fixtures(&command.fixtures, config.as_ref(), &cwd)?;
    let checker = ProcessChecker::new(settings.checker.clone())
        .context("invalid verdict pattern in [checker]")?;
    let checker_name = checker.name().to_string();
    if cases.is_empty() {
        println_yellow_err("No fixtures selected.");
    }

    info!(
        "   Running {} fixtures with `{}` (timeout {:?})",
        cases.len(),
        checker_name,
        settings.timeout
    );
    let opts = RunOpts {
        timeout: settings.timeout,
        runners: settings.runners,
    };
    let tested = vt::run(Arc::new(checker), cases, &opts).await;
    let summary = tested.summary();

    match settings.format {
        OutputFormat::Human => print_human(&tested, &summary),
        OutputFormat::Json => print_json(&tested, &summary, &checker_name)?,
    }

    if let Some(log) = &settings.log {
        if let Err(err) = append_log(log, &tested, &checker_name) {
            // Reported even under `-s`.
            eprintln_yellow(&format!("Failed to record results: {err:?}"));
        }
    }

    Ok(ExitCode::from(summary.outcome()))
}

fn print_human(tested: &Tested, summary: &Summary) {
    for result in &tested.results {
        let state = match result.status() {
            CaseStatus::Passed => "ok".green(),
            CaseStatus::Mismatch => "MISMATCH".red(),
            CaseStatus::Infrastructure => "ERROR".yellow(),
        };
        info!(
            "      test {} ... {} ({:?})",
            result.identifier, state, result.duration
        );
    }

    if tested.failures().next().is_some() {
        info!("");
        info!("   failures:");
        for failure in tested.failures() {
            info!("      {}", failure.identifier.bold());
            if let Some(explanation) = failure.explanation() {
                info!("         {}", explanation);
            }
            for line in tail(failure.diagnostics(), DIAGNOSTIC_TAIL_LINES) {
                info!("         | {}", line);
            }
        }
        info!("");
    }

    let state = match summary.outcome() {
        Outcome::AllPassed => "OK".green(),
        Outcome::Mismatch => "FAILED".red(),
        Outcome::Infrastructure => "ERROR".red(),
    };
    info!(
        "   Result: {}. {} passed. {} mismatched. {} errors. Finished in {:?}.",
        state, summary.passed, summary.mismatched, summary.infrastructure, tested.duration
    );
}

fn print_json(tested: &Tested, summary: &Summary, checker: &str) -> Result<()> {
    let report = JsonReport {
        checker,
        outcome: summary.outcome(),
        summary: summary.clone(),
        results: tested.results.iter().map(|result| result.record()).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn append_log(path: &Path, tested: &Tested, checker: &str) -> Result<()> {
    let recorded_at = chrono::Utc::now().to_rfc3339();
    let records: Vec<LogRecord> = tested
        .results
        .iter()
        .map(|result| {
            let mut record = result.record();
            // Output is kept for failures only.
            if record.passed {
                record.diagnostics.clear();
            }
            LogRecord {
                recorded_at: recorded_at.clone(),
                checker: checker.to_string(),
                result: record,
            }
        })
        .collect();
    ResultsLog::new(path).append(&records)
}

/// The last `count` non-empty lines of `text`.
fn tail(text: &str, count: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    lines[lines.len().saturating_sub(count)..].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VerdictConfig;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    fn command(args: &[&str]) -> RunCommand {
        RunCommand::try_parse_from(std::iter::once("run").chain(args.iter().copied())).unwrap()
    }

    fn config(toml: &str) -> LoadedConfig {
        let dir = Path::new("/corpus");
        let config: VerdictConfig = toml::from_str(toml).unwrap();
        LoadedConfig {
            dir: dir.to_path_buf(),
            config: config.resolve_paths(dir),
        }
    }

    const CONFIG: &str = r#"
[run]
timeout = "90s"
jobs = 2
log = "results.jsonl"

[checker]
program = "cpa.sh"
"#;

    #[test]
    fn flags_win_over_config() {
        let config = config(CONFIG);
        let cwd = Path::new("/work");
        let settings = RunSettings::resolve(
            &command(&["--timeout", "5s", "--jobs", "8", "--log", "mine.jsonl"]),
            Some(&config),
            cwd,
        )
        .unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.runners, TestRunnerCount::Manual(8));
        assert_eq!(settings.log, Some(cwd.join("mine.jsonl")));

        let settings = RunSettings::resolve(&command(&[]), Some(&config), cwd).unwrap();
        assert_eq!(settings.timeout, Duration::from_secs(90));
        assert_eq!(settings.runners, TestRunnerCount::Manual(2));
        assert_eq!(settings.format, OutputFormat::Human);
        assert_eq!(settings.log, Some(Path::new("/corpus").join("results.jsonl")));
    }

    #[test]
    fn defaults_apply_without_run_table() {
        let config = config("[checker]\nprogram = \"cpa.sh\"\n");
        let settings = RunSettings::resolve(&command(&[]), Some(&config), Path::new("/")).unwrap();
        assert_eq!(settings.timeout, vt::DEFAULT_TIMEOUT);
        assert_eq!(settings.runners, TestRunnerCount::Auto);
        assert_eq!(settings.log, None);
    }

    #[test]
    fn checker_table_is_required() {
        let err = RunSettings::resolve(&command(&[]), None, Path::new("/")).unwrap_err();
        assert!(err.to_string().contains("[checker]"), "{err}");
        let config = config("[run]\njobs = 1\n");
        assert!(RunSettings::resolve(&command(&[]), Some(&config), Path::new("/")).is_err());
    }

    #[test]
    fn zero_jobs_is_rejected() {
        let config = config(CONFIG);
        assert!(RunSettings::resolve(&command(&["--jobs", "0"]), Some(&config), Path::new("/")).is_err());
    }

    #[test]
    fn tail_keeps_last_non_empty_lines() {
        let text = "a\n\nb\nc\n\n";
        assert_eq!(tail(text, 2), vec!["b", "c"]);
        assert_eq!(tail(text, 10), vec!["a", "b", "c"]);
        assert!(tail("", 3).is_empty());
    }

    #[test]
    fn log_record_flattens_the_result() {
        let record = LogRecord {
            recorded_at: "2024-05-01T12:00:00+00:00".to_string(),
            checker: "cpa.sh".to_string(),
            result: ResultRecord {
                identifier: "fib".to_string(),
                path: None,
                expected: Some(vt::ExpectedVerdict::Unsafe),
                observed: Some(vt::Observed::Unsafe),
                status: CaseStatus::Passed,
                passed: true,
                explanation: Some("expected UNSAFE, checker reported UNSAFE".to_string()),
                error_kind: None,
                error: None,
                duration_ms: 12,
                diagnostics: String::new(),
            },
        };
        let line = serde_json::to_string(&record).unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["identifier"], "fib");
        assert_eq!(value["recorded_at"], "2024-05-01T12:00:00+00:00");
        let back: LogRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(back, record);
    }
}
