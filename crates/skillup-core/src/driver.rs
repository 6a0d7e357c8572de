//! Exam driver.
//!
//! Runs one exam end to end: spawns the test stream, runs the countdown,
//! and applies user commands. All three feed a single `select!` loop, so
//! session state is only ever touched from one place.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::exam::ExamConfig;
use crate::model::CreateTestRequest;
use crate::scoring::ScoreCard;
use crate::session::{ExamCommand, ExamSession, SessionEffect, SessionEvent};
use crate::traits::{ResultSubmitter, TestSource};

/// Buffered stream envelopes before the source is back-pressured.
const STREAM_BUFFER: usize = 64;

/// One exam second.
const TICK: Duration = Duration::from_secs(1);

/// How an exam ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExamOutcome {
    Completed {
        card: ScoreCard,
        /// The result reached the backend.
        submitted: bool,
    },
    /// The user left before finishing.
    Quit,
    /// Test generation failed.
    Failed(String),
}

/// Receives session changes for display.
pub trait ExamObserver: Send {
    /// Questions, selection or navigation changed.
    fn on_update(&mut self, session: &ExamSession);

    /// The clock moved.
    fn on_tick(&mut self, _session: &ExamSession, _time_left: u32) {}

    /// The exam is over.
    fn on_finished(&mut self, outcome: &ExamOutcome);
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl ExamObserver for NoopObserver {
    fn on_update(&mut self, _: &ExamSession) {}
    fn on_finished(&mut self, _: &ExamOutcome) {}
}

pub struct ExamDriver {
    source: Arc<dyn TestSource>,
    submitter: Option<Arc<dyn ResultSubmitter>>,
    config: ExamConfig,
}

impl ExamDriver {
    pub fn new(source: Arc<dyn TestSource>, config: ExamConfig) -> Self {
        Self {
            source,
            submitter: None,
            config,
        }
    }

    /// Post finished results through `submitter`.
    pub fn with_submitter(mut self, submitter: Arc<dyn ResultSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Run an exam until it is finished, quit, or generation fails.
    pub async fn run(
        &self,
        request: CreateTestRequest,
        mut commands: mpsc::Receiver<ExamCommand>,
        observer: &mut dyn ExamObserver,
    ) -> Result<ExamOutcome> {
        let mut session = ExamSession::start(request.meta.clone(), self.config);
        observer.on_update(&session);

        let (tx, mut events) = mpsc::channel(STREAM_BUFFER);
        let source = Arc::clone(&self.source);
        tracing::info!("starting test stream from {}", source.name());
        let mut stream_task =
            tokio::spawn(async move { source.stream_test(&request, tx).await });

        let mut ticker = tokio::time::interval(TICK);
        // The first tick completes immediately.
        ticker.tick().await;

        let mut stream_open = true;
        let mut commands_open = true;

        let outcome = loop {
            let effect = tokio::select! {
                event = events.recv(), if stream_open => match event {
                    Some(event) => session.apply(SessionEvent::Stream(event)),
                    None => {
                        // Every buffered envelope has been applied; only now
                        // is the task's result allowed to close the stream.
                        stream_open = false;
                        let result = match (&mut stream_task).await {
                            Ok(Ok(())) => Ok(()),
                            Ok(Err(e)) => Err(format!("{e:#}")),
                            Err(e) => Err(format!("stream task failed: {e}")),
                        };
                        session.apply(SessionEvent::StreamClosed(result))
                    }
                },
                _ = ticker.tick() => session.apply(SessionEvent::Tick),
                command = commands.recv(), if commands_open => match command {
                    Some(command) => session.apply(SessionEvent::Command(command)),
                    None => {
                        commands_open = false;
                        SessionEffect::Idle
                    }
                },
            };

            match effect {
                SessionEffect::Idle => {}
                SessionEffect::Updated => observer.on_update(&session),
                SessionEffect::Ticked(time_left) => observer.on_tick(&session, time_left),
                SessionEffect::Submit(card) => {
                    let submitted = self.submit(&session, &card).await;
                    session.finish_submitted();
                    break ExamOutcome::Completed { card, submitted };
                }
                SessionEffect::Exit => break ExamOutcome::Quit,
                SessionEffect::Abort(message) => {
                    tracing::error!("test generation failed: {message}");
                    break ExamOutcome::Failed(message);
                }
            }
        };

        stream_task.abort();
        observer.on_finished(&outcome);
        Ok(outcome)
    }

    async fn submit(&self, session: &ExamSession, card: &ScoreCard) -> bool {
        let Some(submitter) = &self.submitter else {
            return false;
        };
        let Some(payload) = session.submission(card) else {
            return false;
        };
        match submitter.submit_result(&payload).await {
            Ok(()) => {
                tracing::info!("test results submitted");
                true
            }
            Err(e) => {
                // Results are still shown when the backend is unreachable.
                tracing::warn!("failed to submit test results: {e:#}");
                false
            }
        }
    }
}
