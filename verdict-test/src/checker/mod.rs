//! The seam between the harness and the verification engine.

mod group;
pub mod process;

use crate::{HarnessError, TestCase, Verdict};
use async_trait::async_trait;
use std::time::Duration;

pub use process::{ProcessChecker, ProcessCheckerConfig};

/// An external verification engine.
///
/// Implementations must not outlive `timeout`: once it elapses they give up, release
/// anything they started and return [`HarnessError::Timeout`]. The runner enforces a
/// slightly longer deadline of its own around every call.
#[async_trait]
pub trait Checker: Send + Sync {
    /// A short name for logs and reports.
    fn name(&self) -> &str;

    /// Run the engine on one fixture.
    async fn check(&self, case: &TestCase, timeout: Duration) -> Result<Verdict, HarnessError>;
}
