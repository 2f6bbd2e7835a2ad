use crate::{
    compare, Comparison, ExpectedVerdict, HarnessError, Judgement, Observed, TestCase, Verdict,
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// How a single fixture ended up, for counting and exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    Passed,
    /// The checker gave a verdict other than the expected one.
    Mismatch,
    /// The fixture could not be loaded or the checker gave no verdict.
    Infrastructure,
}

/// The result of running a single fixture.
#[derive(Clone, Debug)]
pub struct CaseResult {
    pub identifier: String,
    /// The file the fixture was read from.
    pub path: Option<PathBuf>,
    /// Absent when the fixture failed to load.
    pub expected: Option<ExpectedVerdict>,
    /// What the checker reported. Errors and timeouts are recorded as `ERROR` and
    /// `TIMEOUT` so they can be judged like any other answer.
    pub verdict: Option<Verdict>,
    pub comparison: Option<Comparison>,
    pub error: Option<HarnessError>,
    /// Time spent in the checker.
    pub duration: Duration,
}

impl CaseResult {
    /// Judge the outcome of checking `case`.
    pub fn from_check(
        case: &TestCase,
        outcome: Result<Verdict, HarnessError>,
        duration: Duration,
    ) -> Self {
        let (verdict, error) = match outcome {
            Ok(verdict) => (verdict, None),
            Err(err) => {
                let observed = match err {
                    HarnessError::Timeout { .. } => Observed::Timeout,
                    _ => Observed::Error,
                };
                let diagnostics = err.diagnostics().unwrap_or_default().to_string();
                (Verdict::new(observed, diagnostics), Some(err))
            }
        };
        Self {
            identifier: case.identifier().to_string(),
            path: case.path().map(PathBuf::from),
            expected: Some(case.expected()),
            comparison: Some(compare(case.expected(), verdict.observed())),
            verdict: Some(verdict),
            error,
            duration,
        }
    }

    /// A fixture that never reached the checker.
    pub fn load_failed(err: HarnessError) -> Self {
        let path = match &err {
            HarnessError::NotFound { path, .. } => Some(path.clone()),
            _ => None,
        };
        Self {
            identifier: err.identifier().to_string(),
            path,
            expected: None,
            verdict: None,
            comparison: None,
            error: Some(err),
            duration: Duration::ZERO,
        }
    }

    pub fn status(&self) -> CaseStatus {
        if self.error.is_some() {
            return CaseStatus::Infrastructure;
        }
        match self.comparison.as_ref().map(|cmp| cmp.judgement) {
            Some(Judgement::Pass) => CaseStatus::Passed,
            Some(Judgement::Mismatch) => CaseStatus::Mismatch,
            Some(Judgement::Inconclusive) | None => CaseStatus::Infrastructure,
        }
    }

    pub fn passed(&self) -> bool {
        self.status() == CaseStatus::Passed
    }

    pub fn observed(&self) -> Option<Observed> {
        self.verdict.as_ref().map(Verdict::observed)
    }

    /// Output captured from the checker, if it produced any.
    pub fn diagnostics(&self) -> &str {
        self.verdict
            .as_ref()
            .map(Verdict::diagnostics)
            .unwrap_or_default()
    }

    /// Why the fixture did not pass, if it did not.
    pub fn explanation(&self) -> Option<String> {
        match (&self.error, &self.comparison) {
            (Some(err), _) => Some(err.to_string()),
            (None, Some(cmp)) if !cmp.passed() => Some(cmp.explanation.clone()),
            _ => None,
        }
    }

    pub fn record(&self) -> ResultRecord {
        ResultRecord {
            identifier: self.identifier.clone(),
            path: self.path.as_ref().map(|p| p.display().to_string()),
            expected: self.expected,
            observed: self.observed(),
            status: self.status(),
            passed: self.passed(),
            explanation: self.comparison.as_ref().map(|cmp| cmp.explanation.clone()),
            error_kind: self.error.as_ref().map(|err| err.kind().to_string()),
            error: self.error.as_ref().map(ToString::to_string),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            diagnostics: self.diagnostics().to_string(),
        }
    }
}

/// The serialised form of a [`CaseResult`], used by JSON output and the results log.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub identifier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub expected: Option<ExpectedVerdict>,
    pub observed: Option<Observed>,
    pub status: CaseStatus,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub diagnostics: String,
}

/// The overall result of a batch, in order of severity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    AllPassed,
    Mismatch,
    Infrastructure,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub mismatched: usize,
    pub infrastructure: usize,
    pub duration_ms: u64,
}

impl Summary {
    /// Infrastructure failures outrank mismatches.
    pub fn outcome(&self) -> Outcome {
        if self.infrastructure > 0 {
            Outcome::Infrastructure
        } else if self.mismatched > 0 {
            Outcome::Mismatch
        } else {
            Outcome::AllPassed
        }
    }
}

/// The result of a run, in the order the fixtures were given.
#[derive(Debug)]
pub struct Tested {
    pub results: Vec<CaseResult>,
    pub duration: Duration,
}

impl Tested {
    pub fn summary(&self) -> Summary {
        let mut summary = Summary {
            total: self.results.len(),
            duration_ms: u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        };
        for result in &self.results {
            match result.status() {
                CaseStatus::Passed => summary.passed += 1,
                CaseStatus::Mismatch => summary.mismatched += 1,
                CaseStatus::Infrastructure => summary.infrastructure += 1,
            }
        }
        summary
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseResult> {
        self.results.iter().filter(|result| !result.passed())
    }
}
