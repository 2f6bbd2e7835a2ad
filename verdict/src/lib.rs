pub mod cli;
pub mod config;
pub mod ops;

use verdict_test::Outcome;

/// How `verdict` reports the overall result to its caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// Every fixture passed.
    Success,
    /// At least one checker answered with the wrong verdict, and nothing else went wrong.
    Mismatch,
    /// Bad flags, a bad config file or an unreadable manifest.
    Usage,
    /// A fixture failed to load or the checker gave no verdict.
    Infrastructure,
}

impl ExitCode {
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Mismatch => 1,
            ExitCode::Usage => 2,
            ExitCode::Infrastructure => 3,
        }
    }
}

impl From<Outcome> for ExitCode {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::AllPassed => ExitCode::Success,
            Outcome::Mismatch => ExitCode::Mismatch,
            Outcome::Infrastructure => ExitCode::Infrastructure,
        }
    }
}
