//! Mock test source and result submitter for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use skillup_core::model::{CreateTestRequest, TestResultSubmission};
use skillup_core::traits::{ResultSubmitter, StreamEvent, TestSource};

/// A test source that replays a fixed script of stream events.
pub struct MockTestSource {
    events: Vec<StreamEvent>,
    /// Returned after the script instead of `Ok(())`.
    failure: Option<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<CreateTestRequest>>,
}

impl MockTestSource {
    pub fn new(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            failure: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Stream `questions`, signal readiness after the first, then complete.
    pub fn with_questions(questions: Vec<Value>) -> Self {
        let mut events = Vec::with_capacity(questions.len() + 2);
        for (i, question) in questions.into_iter().enumerate() {
            events.push(StreamEvent::Question(question));
            if i == 0 {
                events.push(StreamEvent::InitialReady);
            }
        }
        events.push(StreamEvent::Complete);
        Self::new(events)
    }

    /// Fail with `message` once the script is exhausted.
    pub fn failing_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    pub fn last_request(&self) -> Option<CreateTestRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl TestSource for MockTestSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream_test(
        &self,
        request: &CreateTestRequest,
        events: mpsc::Sender<StreamEvent>,
    ) -> anyhow::Result<()> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap_or_else(|e| e.into_inner()) = Some(request.clone());

        for event in &self.events {
            if events.send(event.clone()).await.is_err() {
                return Ok(());
            }
        }
        match &self.failure {
            Some(message) => anyhow::bail!("{message}"),
            None => Ok(()),
        }
    }
}

/// A submitter that records every result it receives.
#[derive(Default)]
pub struct RecordingSubmitter {
    submitted: Mutex<Vec<TestResultSubmission>>,
    fail: bool,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record results but report every submission as failed.
    pub fn failing() -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn submitted(&self) -> Vec<TestResultSubmission> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl ResultSubmitter for RecordingSubmitter {
    async fn submit_result(&self, result: &TestResultSubmission) -> anyhow::Result<()> {
        self.submitted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(result.clone());
        if self.fail {
            anyhow::bail!("submission rejected");
        }
        Ok(())
    }
}
