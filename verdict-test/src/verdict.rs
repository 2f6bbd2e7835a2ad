use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The verdict a fixture's author expects from a sound checker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedVerdict {
    /// No reachable property violation.
    Safe,
    /// A property violation is reachable.
    Unsafe,
    /// The fixture carries no ground truth.
    Unknown,
}

/// What the checker actually reported for one invocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Observed {
    Safe,
    Unsafe,
    Error,
    Timeout,
}

impl fmt::Display for ExpectedVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExpectedVerdict::Safe => "SAFE",
            ExpectedVerdict::Unsafe => "UNSAFE",
            ExpectedVerdict::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Observed::Safe => "SAFE",
            Observed::Unsafe => "UNSAFE",
            Observed::Error => "ERROR",
            Observed::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}

impl FromStr for ExpectedVerdict {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "safe" => Ok(ExpectedVerdict::Safe),
            "unsafe" => Ok(ExpectedVerdict::Unsafe),
            "unknown" => Ok(ExpectedVerdict::Unknown),
            _ => Err(format!(
                "unknown expected verdict `{s}`, expected one of: safe, unsafe, unknown"
            )),
        }
    }
}

/// The outcome of one checker invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    observed: Observed,
    /// Everything the checker printed, stdout first.
    diagnostics: String,
}

impl Verdict {
    pub fn new(observed: Observed, diagnostics: impl Into<String>) -> Self {
        Self {
            observed,
            diagnostics: diagnostics.into(),
        }
    }

    pub fn observed(&self) -> Observed {
        self.observed
    }

    pub fn diagnostics(&self) -> &str {
        &self.diagnostics
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgement {
    Pass,
    /// The checker answered, but not with the expected verdict.
    Mismatch,
    /// The checker did not answer (timeout or error).
    Inconclusive,
}

/// The result of judging one observed verdict against the expected one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Comparison {
    pub judgement: Judgement,
    pub explanation: String,
}

impl Comparison {
    pub fn passed(&self) -> bool {
        self.judgement == Judgement::Pass
    }
}

/// Judge `observed` against `expected`.
///
/// SAFE passes only against SAFE and UNSAFE only against UNSAFE. TIMEOUT and ERROR
/// never pass and are judged inconclusive rather than mismatched, whatever was
/// expected. An UNKNOWN expectation has nothing to match, so any answer is a mismatch.
pub fn compare(expected: ExpectedVerdict, observed: Observed) -> Comparison {
    let (judgement, explanation) = match (expected, observed) {
        (_, Observed::Timeout) => (
            Judgement::Inconclusive,
            format!("expected {expected}, but the checker timed out before reaching a verdict"),
        ),
        (_, Observed::Error) => (
            Judgement::Inconclusive,
            format!("expected {expected}, but the checker reported an error instead of a verdict"),
        ),
        (ExpectedVerdict::Safe, Observed::Safe) | (ExpectedVerdict::Unsafe, Observed::Unsafe) => {
            (
                Judgement::Pass,
                format!("expected {expected}, checker reported {observed}"),
            )
        }
        (ExpectedVerdict::Unknown, _) => (
            Judgement::Mismatch,
            format!("fixture has no ground truth (expected {expected}), checker reported {observed}"),
        ),
        (_, _) => (
            Judgement::Mismatch,
            format!("expected {expected}, checker reported {observed}"),
        ),
    };
    Comparison {
        judgement,
        explanation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_OBSERVED: [Observed; 4] = [
        Observed::Safe,
        Observed::Unsafe,
        Observed::Error,
        Observed::Timeout,
    ];

    #[test]
    fn safe_passes_only_against_safe() {
        for observed in ALL_OBSERVED {
            let cmp = compare(ExpectedVerdict::Safe, observed);
            assert_eq!(cmp.passed(), observed == Observed::Safe, "{observed}");
        }
    }

    #[test]
    fn unsafe_passes_only_against_unsafe() {
        for observed in ALL_OBSERVED {
            let cmp = compare(ExpectedVerdict::Unsafe, observed);
            assert_eq!(cmp.passed(), observed == Observed::Unsafe, "{observed}");
        }
    }

    #[test]
    fn timeout_and_error_are_inconclusive_not_mismatch() {
        for expected in [
            ExpectedVerdict::Safe,
            ExpectedVerdict::Unsafe,
            ExpectedVerdict::Unknown,
        ] {
            for observed in [Observed::Error, Observed::Timeout] {
                let cmp = compare(expected, observed);
                assert_eq!(cmp.judgement, Judgement::Inconclusive);
            }
        }
    }

    #[test]
    fn wrong_answer_is_a_mismatch() {
        let cmp = compare(ExpectedVerdict::Unsafe, Observed::Safe);
        assert_eq!(cmp.judgement, Judgement::Mismatch);
        assert_eq!(cmp.explanation, "expected UNSAFE, checker reported SAFE");
    }

    #[test]
    fn unknown_expectation_never_passes() {
        for observed in [Observed::Safe, Observed::Unsafe] {
            let cmp = compare(ExpectedVerdict::Unknown, observed);
            assert_eq!(cmp.judgement, Judgement::Mismatch);
            assert!(cmp.explanation.contains("no ground truth"));
        }
    }

    #[test]
    fn expected_verdict_parses_case_insensitively() {
        assert_eq!("UNSAFE".parse(), Ok(ExpectedVerdict::Unsafe));
        assert_eq!("safe".parse(), Ok(ExpectedVerdict::Safe));
        assert!("maybe".parse::<ExpectedVerdict>().is_err());
    }
}
