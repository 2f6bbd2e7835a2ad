use std::{path::PathBuf, time::Duration};
use thiserror::Error;

/// Infrastructure failures for a single fixture.
///
/// Every variant names the fixture it belongs to. A verdict that disagrees with the
/// expected one is not an error; see [`crate::Judgement::Mismatch`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HarnessError {
    #[error("{identifier}: no fixture at {}", path.display())]
    NotFound { identifier: String, path: PathBuf },
    #[error("{identifier}: malformed fixture: {reason}")]
    MalformedFixture { identifier: String, reason: String },
    #[error("{identifier}: checker unavailable: {reason}")]
    CheckerUnavailable { identifier: String, reason: String },
    #[error("{identifier}: checker gave no result within {after:?}")]
    Timeout { identifier: String, after: Duration },
    #[error("{identifier}: checker terminated abnormally ({status})")]
    CheckerCrash {
        identifier: String,
        status: String,
        diagnostics: String,
    },
}

impl HarnessError {
    pub fn identifier(&self) -> &str {
        match self {
            HarnessError::NotFound { identifier, .. }
            | HarnessError::MalformedFixture { identifier, .. }
            | HarnessError::CheckerUnavailable { identifier, .. }
            | HarnessError::Timeout { identifier, .. }
            | HarnessError::CheckerCrash { identifier, .. } => identifier,
        }
    }

    /// A stable, machine-readable name for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            HarnessError::NotFound { .. } => "not-found",
            HarnessError::MalformedFixture { .. } => "malformed-fixture",
            HarnessError::CheckerUnavailable { .. } => "checker-unavailable",
            HarnessError::Timeout { .. } => "timeout",
            HarnessError::CheckerCrash { .. } => "checker-crash",
        }
    }

    /// Whether the error was raised while loading the fixture, before any checker ran.
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            HarnessError::NotFound { .. } | HarnessError::MalformedFixture { .. }
        )
    }

    /// Output captured from the checker, when the error carries any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            HarnessError::CheckerCrash { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }

    pub(crate) fn malformed(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        HarnessError::MalformedFixture {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_error_is_attributed() {
        let errors = [
            HarnessError::NotFound {
                identifier: "a.c".into(),
                path: "a.c".into(),
            },
            HarnessError::malformed("b.c", "no expected verdict"),
            HarnessError::CheckerUnavailable {
                identifier: "c.c".into(),
                reason: "missing".into(),
            },
            HarnessError::Timeout {
                identifier: "d.c".into(),
                after: Duration::from_secs(1),
            },
            HarnessError::CheckerCrash {
                identifier: "e.c".into(),
                status: "signal: 11".into(),
                diagnostics: "core dumped".into(),
            },
        ];
        for err in &errors {
            assert!(err.to_string().starts_with(err.identifier()));
        }
        assert!(errors[0].is_load_error() && errors[1].is_load_error());
        assert!(!errors[3].is_load_error());
        assert_eq!(errors[4].diagnostics(), Some("core dumped"));
        assert_eq!(errors[3].kind(), "timeout");
    }
}
