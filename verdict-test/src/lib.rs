//! Load verification fixtures, hand them to an external checker and judge its verdicts.
//!
//! A fixture is a program file plus the verdict its author expects (SAFE, UNSAFE or
//! UNKNOWN). [`run`] checks a batch of fixtures concurrently through a [`Checker`] and
//! compares each answer with the expected verdict.

pub mod checker;
mod error;
pub mod filter;
pub mod fixture;
mod report;
mod run;
mod verdict;

pub use checker::{Checker, ProcessChecker, ProcessCheckerConfig};
pub use error::HarnessError;
pub use filter::FixtureFilter;
pub use fixture::{
    load_fixture, load_with, FixtureSources, Loaded, Manifest, ManifestEntry, TestCase,
};
pub use report::{CaseResult, CaseStatus, Outcome, ResultRecord, Summary, Tested};
pub use run::{run, RunOpts, TestRunnerCount, DEFAULT_TIMEOUT, MAX_TIMEOUT};
pub use verdict::{compare, Comparison, ExpectedVerdict, Judgement, Observed, Verdict};
