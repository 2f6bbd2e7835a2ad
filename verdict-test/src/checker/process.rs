//! Runs a checker as an external program and reads its verdict from its output.
//!
//! The program sees a copy of the fixture in a private scratch directory. Its stdout
//! and stderr are matched against three patterns, tried in order: unsafe, safe and
//! unknown. The defaults match CPAchecker's `Verification result:` line.

use super::{group::ProcessGroup, Checker};
use crate::{HarnessError, Observed, TestCase, Verdict, MAX_TIMEOUT};
use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};
use tempfile::TempDir;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    sync::oneshot,
    time::{self, Instant},
};

pub const DEFAULT_UNSAFE_PATTERN: &str = "Verification result: FALSE";
pub const DEFAULT_SAFE_PATTERN: &str = "Verification result: TRUE";
pub const DEFAULT_UNKNOWN_PATTERN: &str = "Verification result: UNKNOWN";

/// How long output is still read after the checker exits.
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// How to invoke the checker program.
///
/// `args` may contain `{file}` (the fixture copy), `{entry}` (the entry point) and
/// `{name}` (the fixture identifier).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessCheckerConfig {
    pub program: PathBuf,
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default = "default_unsafe_pattern")]
    pub unsafe_pattern: String,
    #[serde(default = "default_safe_pattern")]
    pub safe_pattern: String,
    #[serde(default = "default_unknown_pattern")]
    pub unknown_pattern: Option<String>,
    /// Extra attempts after the checker crashes.
    #[serde(default)]
    pub retries: u32,
}

fn default_args() -> Vec<String> {
    vec!["{file}".to_string()]
}

fn default_unsafe_pattern() -> String {
    DEFAULT_UNSAFE_PATTERN.to_string()
}

fn default_safe_pattern() -> String {
    DEFAULT_SAFE_PATTERN.to_string()
}

fn default_unknown_pattern() -> Option<String> {
    Some(DEFAULT_UNKNOWN_PATTERN.to_string())
}

impl ProcessCheckerConfig {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: default_args(),
            env: BTreeMap::new(),
            unsafe_pattern: default_unsafe_pattern(),
            safe_pattern: default_safe_pattern(),
            unknown_pattern: default_unknown_pattern(),
            retries: 0,
        }
    }

    /// CPAchecker's launcher with its default analysis.
    pub fn cpachecker() -> Self {
        Self {
            args: ["-default", "-entryfunction", "{entry}", "{file}"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            ..Self::new("cpa.sh")
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

pub struct ProcessChecker {
    name: String,
    config: ProcessCheckerConfig,
    unsafe_re: Regex,
    safe_re: Regex,
    unknown_re: Option<Regex>,
}

fn pattern(source: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(source).multi_line(true).build()
}

impl ProcessChecker {
    pub fn new(config: ProcessCheckerConfig) -> Result<Self, regex::Error> {
        let name = config
            .program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| config.program.display().to_string());
        Ok(Self {
            name,
            unsafe_re: pattern(&config.unsafe_pattern)?,
            safe_re: pattern(&config.safe_pattern)?,
            unknown_re: config.unknown_pattern.as_deref().map(pattern).transpose()?,
            config,
        })
    }

    pub fn config(&self) -> &ProcessCheckerConfig {
        &self.config
    }

    /// The verdict named by the checker's output, if any.
    pub fn classify(&self, output: &str) -> Option<Observed> {
        if self.unsafe_re.is_match(output) {
            Some(Observed::Unsafe)
        } else if self.safe_re.is_match(output) {
            Some(Observed::Safe)
        } else if self.unknown_re.as_ref().is_some_and(|re| re.is_match(output)) {
            Some(Observed::Error)
        } else {
            None
        }
    }

    fn command(&self, case: &TestCase, file: &Path, scratch: &Path) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(
            self.config
                .args
                .iter()
                .map(|arg| substitute(arg, file, case)),
        )
        .envs(&self.config.env)
        .current_dir(scratch)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    async fn invoke(&self, case: &TestCase, timeout: Duration) -> Result<Verdict, HarnessError> {
        let identifier = case.identifier();
        let unavailable = |reason: String| HarnessError::CheckerUnavailable {
            identifier: identifier.to_string(),
            reason,
        };

        let scratch = TempDir::new()
            .map_err(|e| unavailable(format!("failed to create scratch directory: {e}")))?;
        let file = scratch.path().join(case.file_name());
        tokio::fs::write(&file, case.source_text().as_bytes())
            .await
            .map_err(|e| unavailable(format!("failed to write {}: {e}", file.display())))?;

        let mut child = self
            .command(case, &file, scratch.path())
            .spawn()
            .map_err(|e| {
                unavailable(format!(
                    "failed to start `{}`: {e}",
                    self.config.program.display()
                ))
            })?;
        // Dropped on every path out of this function, taking any stragglers with it.
        let group = ProcessGroup::new(child.id());
        tracing::debug!("{}: started {} (pid {:?})", identifier, self.name, child.id());

        let collected = time::timeout(timeout, collect_output(&mut child, group.as_ref())).await;
        let (status, stdout, stderr) = match collected {
            Ok(Ok(collected)) => collected,
            Ok(Err(e)) => {
                return Err(HarnessError::CheckerCrash {
                    identifier: identifier.to_string(),
                    status: format!("lost track of the checker: {e}"),
                    diagnostics: String::new(),
                })
            }
            Err(_) => {
                let _ = child.start_kill();
                if let Some(group) = &group {
                    group.kill();
                }
                let _ = child.wait().await;
                return Err(HarnessError::Timeout {
                    identifier: identifier.to_string(),
                    after: timeout,
                });
            }
        };

        let diagnostics = match (stdout.is_empty(), stderr.is_empty()) {
            (_, true) => stdout,
            (true, false) => stderr,
            (false, false) => format!("{stdout}\n{stderr}"),
        };
        match self.classify(&diagnostics) {
            Some(observed) => Ok(Verdict::new(observed, diagnostics)),
            None if status.success() => Ok(Verdict::new(Observed::Error, diagnostics)),
            None => Err(HarnessError::CheckerCrash {
                identifier: identifier.to_string(),
                status: status.to_string(),
                diagnostics,
            }),
        }
    }
}

#[async_trait]
impl Checker for ProcessChecker {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check(&self, case: &TestCase, timeout: Duration) -> Result<Verdict, HarnessError> {
        let timeout = timeout.min(MAX_TIMEOUT);
        let deadline = Instant::now() + timeout;
        let mut attempt = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(HarnessError::Timeout {
                    identifier: case.identifier().to_string(),
                    after: timeout,
                });
            }
            match self.invoke(case, remaining).await {
                Err(HarnessError::Timeout { identifier, .. }) => {
                    return Err(HarnessError::Timeout {
                        identifier,
                        after: timeout,
                    })
                }
                Err(err @ HarnessError::CheckerCrash { .. }) if attempt < self.config.retries => {
                    attempt += 1;
                    tracing::warn!(
                        "{} (retry {}/{})",
                        err,
                        attempt,
                        self.config.retries
                    );
                }
                result => return result,
            }
        }
    }
}

fn substitute(arg: &str, file: &Path, case: &TestCase) -> String {
    arg.replace("{file}", &file.to_string_lossy())
        .replace("{entry}", case.entry_point())
        .replace("{name}", case.identifier())
}

/// Wait for the checker and read its output.
///
/// Once the checker exits, whatever it left running in its group is killed and the
/// pipes get [`DRAIN_GRACE`] to reach end of file. Output read by then is kept.
async fn collect_output(
    child: &mut Child,
    group: Option<&ProcessGroup>,
) -> std::io::Result<(ExitStatus, String, String)> {
    let stdout_pipe = child.stdout.take();
    let stderr_pipe = child.stderr.take();
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let (exited_tx, exited_rx) = oneshot::channel::<()>();

    let exited = async {
        let status = child.wait().await;
        if let Some(group) = group {
            group.kill();
        }
        let _ = exited_tx.send(());
        status
    };
    let drained = async {
        tokio::select! {
            result = async {
                tokio::try_join!(drain(stdout_pipe, &mut stdout), drain(stderr_pipe, &mut stderr))
            } => result.map(|_| ()),
            _ = async {
                let _ = exited_rx.await;
                time::sleep(DRAIN_GRACE).await;
            } => {
                tracing::debug!("checker output still open after exit; stopped reading");
                Ok(())
            }
        }
    };
    let (status, drained) = tokio::join!(exited, drained);
    let status = status?;
    drained?;
    Ok((
        status,
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    ))
}

/// Read `pipe` to end of file into `buf`. Bytes already read stay in `buf` if the
/// future is dropped early.
async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>, buf: &mut Vec<u8>) -> std::io::Result<()> {
    let Some(mut pipe) = pipe else {
        return Ok(());
    };
    let mut chunk = [0u8; 8192];
    loop {
        let read = pipe.read(&mut chunk).await?;
        if read == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..read]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExpectedVerdict;

    fn checker() -> ProcessChecker {
        ProcessChecker::new(ProcessCheckerConfig::cpachecker()).unwrap()
    }

    #[test]
    fn unsafe_is_tried_first() {
        let output = "Verification result: TRUE\nVerification result: FALSE. Property violation\n";
        assert_eq!(checker().classify(output), Some(Observed::Unsafe));
    }

    #[test]
    fn recognises_cpachecker_results() {
        let checker = checker();
        assert_eq!(
            checker.classify("Verification result: TRUE. No property violation found."),
            Some(Observed::Safe)
        );
        assert_eq!(
            checker.classify("Verification result: UNKNOWN, incomplete analysis."),
            Some(Observed::Error)
        );
        assert_eq!(checker.classify("Exception in thread \"main\""), None);
    }

    #[test]
    fn unknown_pattern_is_optional() {
        let mut config = ProcessCheckerConfig::new("checker");
        config.unknown_pattern = None;
        let checker = ProcessChecker::new(config).unwrap();
        assert_eq!(checker.classify("Verification result: UNKNOWN"), None);
    }

    #[test]
    fn patterns_are_multi_line() {
        let mut config = ProcessCheckerConfig::new("checker");
        config.safe_pattern = "^SAFE$".to_string();
        let checker = ProcessChecker::new(config).unwrap();
        assert_eq!(checker.classify("starting\nSAFE\ndone"), Some(Observed::Safe));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let mut config = ProcessCheckerConfig::new("checker");
        config.unsafe_pattern = "(".to_string();
        assert!(ProcessChecker::new(config).is_err());
    }

    #[test]
    fn placeholders_are_substituted() {
        let case = TestCase::new("cpbm/fb", "int f(){}", ExpectedVerdict::Safe).with_entry_point("f");
        let file = Path::new("/tmp/scratch/fb.c");
        assert_eq!(
            substitute("--entry={entry}", file, &case),
            "--entry=f"
        );
        assert_eq!(substitute("{file}", file, &case), "/tmp/scratch/fb.c");
        assert_eq!(substitute("{name}.log", file, &case), "cpbm/fb.log");
    }

    #[test]
    fn config_defaults_from_toml() {
        let config: ProcessCheckerConfig = toml::from_str("program = \"scripts/cpa.sh\"").unwrap();
        assert_eq!(config, ProcessCheckerConfig::new("scripts/cpa.sh"));
        assert_eq!(checker().name(), "cpa.sh");
    }
}
