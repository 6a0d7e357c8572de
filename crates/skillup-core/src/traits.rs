//! Async seams between the exam logic and the network.
//!
//! Implemented by `skillup-client` against the real backend, and by mocks
//! in tests.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::model::{CreateTestRequest, TestResultSubmission};

/// One decoded envelope from the test generation stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A raw, not yet normalized, question payload.
    Question(Value),
    /// Enough questions exist for the user to start.
    InitialReady,
    /// The generator finished.
    Complete,
    /// The generator reported a failure.
    Error(String),
}

/// Something that can generate a test as a stream of events.
#[async_trait]
pub trait TestSource: Send + Sync {
    /// Human-readable source name.
    fn name(&self) -> &str;

    /// Stream a test into `events`.
    ///
    /// Resolves `Ok` once the generator completes (or the body ends
    /// cleanly) and `Err` on network failure, a non-success status, or an
    /// error envelope. A closed receiver is not an error: the caller has
    /// simply stopped listening.
    async fn stream_test(
        &self,
        request: &CreateTestRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> anyhow::Result<()>;
}

/// Receives finished exam results.
#[async_trait]
pub trait ResultSubmitter: Send + Sync {
    async fn submit_result(&self, result: &TestResultSubmission) -> anyhow::Result<()>;
}
