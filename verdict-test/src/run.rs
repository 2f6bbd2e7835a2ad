use crate::{CaseResult, Checker, HarnessError, Loaded, TestCase, Tested};
use dashmap::DashMap;
use std::{collections::HashSet, num::NonZeroUsize, sync::Arc, time::Duration};
use tokio::{
    sync::Semaphore,
    task::JoinHandle,
    time::{self, Instant},
};

/// The timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// The longest timeout a check is given. Longer timeouts are cut down to this.
pub const MAX_TIMEOUT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How far past the configured timeout the runner waits on a checker before giving up
/// on it.
const BACKSTOP_FACTOR: f64 = 1.1;

/// How many checks may run at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TestRunnerCount {
    Manual(usize),
    Auto,
}

impl TestRunnerCount {
    pub fn count(self) -> usize {
        match self {
            TestRunnerCount::Manual(runner_count) => runner_count.max(1),
            TestRunnerCount::Auto => std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RunOpts {
    pub timeout: Duration,
    pub runners: TestRunnerCount,
}

impl Default for RunOpts {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            runners: TestRunnerCount::Auto,
        }
    }
}

enum Slot {
    /// Filled in the collector once the check finishes.
    Pending(String),
    Ready(CaseResult),
}

/// Check every loaded fixture and judge the verdicts.
///
/// Each fixture runs in its own task, at most `opts.runners` at a time. Fixtures that
/// failed to load are reported without reaching the checker. A check that panics or
/// overruns its timeout fails on its own; the rest of the batch carries on. Results
/// come back in the order the fixtures were given.
pub async fn run(checker: Arc<dyn Checker>, cases: Vec<Loaded>, opts: &RunOpts) -> Tested {
    let start = Instant::now();
    let runners = opts.runners.count();
    let semaphore = Arc::new(Semaphore::new(runners));
    let collected: Arc<DashMap<String, CaseResult>> = Arc::new(DashMap::new());
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(cases.len());
    let mut handles: Vec<(TestCase, JoinHandle<()>)> = vec![];

    tracing::debug!(
        "checking {} fixtures with `{}` on {} runners",
        cases.len(),
        checker.name(),
        runners
    );

    for loaded in cases {
        let identifier = match &loaded {
            Ok(case) => case.identifier().to_string(),
            Err(err) => err.identifier().to_string(),
        };
        if !seen.insert(identifier.clone()) {
            slots.push(Slot::Ready(CaseResult::load_failed(HarnessError::malformed(
                identifier,
                "identifier already used by an earlier fixture in this run",
            ))));
            continue;
        }
        let case = match loaded {
            Ok(case) => case,
            Err(err) => {
                slots.push(Slot::Ready(CaseResult::load_failed(err)));
                continue;
            }
        };

        let checker = checker.clone();
        let semaphore = semaphore.clone();
        let collected = collected.clone();
        let timeout = opts.timeout.min(MAX_TIMEOUT);
        let handle = tokio::spawn({
            let case = case.clone();
            async move {
                // The semaphore is never closed.
                let _permit = semaphore.acquire().await.ok();
                let started = Instant::now();
                let backstop = timeout.mul_f64(BACKSTOP_FACTOR);
                let outcome = match time::timeout(backstop, checker.check(&case, timeout)).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        tracing::warn!(
                            "{}: `{}` ignored its timeout; abandoned after {:?}",
                            case.identifier(),
                            checker.name(),
                            backstop
                        );
                        Err(HarnessError::Timeout {
                            identifier: case.identifier().to_string(),
                            after: timeout,
                        })
                    }
                };
                let result = CaseResult::from_check(&case, outcome, started.elapsed());
                tracing::debug!("{}: {:?}", result.identifier, result.status());
                collected.insert(case.identifier().to_string(), result);
            }
        });
        handles.push((case, handle));
        slots.push(Slot::Pending(identifier));
    }

    for (case, handle) in handles {
        if let Err(err) = handle.await {
            let status = if err.is_panic() {
                format!("checker panicked: {}", panic_message(err.into_panic()))
            } else {
                "check was cancelled".to_string()
            };
            tracing::error!("{}: {}", case.identifier(), status);
            let crash = HarnessError::CheckerCrash {
                identifier: case.identifier().to_string(),
                status,
                diagnostics: String::new(),
            };
            collected.insert(
                case.identifier().to_string(),
                CaseResult::from_check(&case, Err(crash), Duration::ZERO),
            );
        }
    }

    let results = slots
        .into_iter()
        .filter_map(|slot| match slot {
            Slot::Pending(identifier) => collected.remove(&identifier).map(|(_, result)| result),
            Slot::Ready(result) => Some(result),
        })
        .collect();
    Tested {
        results,
        duration: start.elapsed(),
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
