//! A single exam: the test store and the exam state machine driven by one
//! stream of events.
//!
//! Stream envelopes, timer ticks and user commands all become
//! [`SessionEvent`]s applied by [`ExamSession::apply`], one at a time. The
//! returned [`SessionEffect`] tells the caller what to do next.

use crate::exam::{Exam, ExamConfig, ExamPhase, Selection, Step, NO_QUESTIONS};
use crate::model::{OptionId, Question, TestMeta, TestResultSubmission};
use crate::scoring::ScoreCard;
use crate::store::{TestAction, TestState, TestStore};
use crate::traits::StreamEvent;

/// User input during an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamCommand {
    Select(OptionId),
    Confirm,
    Next,
    Previous,
    /// Leave without submitting.
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Stream(StreamEvent),
    /// The stream task ended; `Err` carries the failure message.
    StreamClosed(Result<(), String>),
    Tick,
    Command(ExamCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEffect {
    /// Nothing visible changed.
    Idle,
    /// The question view changed.
    Updated,
    /// One second passed; carries the remaining time.
    Ticked(u32),
    /// Submit this score, then call [`ExamSession::finish_submitted`].
    Submit(ScoreCard),
    /// The user left the exam.
    Exit,
    /// Test generation failed.
    Abort(String),
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    store: TestStore,
    exam: Exam,
}

impl ExamSession {
    /// Begin a streamed test: the store starts empty and loading.
    pub fn start(meta: TestMeta, config: ExamConfig) -> Self {
        let mut session = Self {
            store: TestStore::new(),
            exam: Exam::new(config),
        };
        session.store.dispatch(TestAction::StartStreaming(meta));
        session.sync();
        session
    }

    pub fn state(&self) -> &TestState {
        self.store.state()
    }

    pub fn exam(&self) -> &Exam {
        &self.exam
    }

    pub fn questions(&self) -> &[Question] {
        self.store.state().questions()
    }

    pub fn phase(&self) -> ExamPhase {
        self.exam.phase(self.store.state())
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.questions().get(self.exam.index())
    }

    pub fn selection(&self) -> Selection {
        self.exam.selection(self.questions())
    }

    /// Result payload for a score card of this test.
    pub fn submission(&self, card: &ScoreCard) -> Option<TestResultSubmission> {
        self.store
            .test()
            .map(|t| TestResultSubmission::new(&t.meta, card.correct, card.total))
    }

    pub fn apply(&mut self, event: SessionEvent) -> SessionEffect {
        match event {
            SessionEvent::Stream(StreamEvent::Question(raw)) => {
                self.store.dispatch(TestAction::AddQuestion(raw));
                self.after_stream_change()
            }
            SessionEvent::Stream(StreamEvent::InitialReady) => {
                tracing::info!("initial questions ready");
                self.store.dispatch(TestAction::InitialReady);
                self.after_stream_change()
            }
            SessionEvent::Stream(StreamEvent::Complete) => {
                self.store.dispatch(TestAction::CompleteStreaming);
                self.after_stream_change()
            }
            SessionEvent::StreamClosed(Ok(())) => {
                if !self.store.state().is_streaming {
                    return SessionEffect::Idle;
                }
                self.store.dispatch(TestAction::CompleteStreaming);
                self.after_stream_change()
            }
            SessionEvent::Stream(StreamEvent::Error(message))
            | SessionEvent::StreamClosed(Err(message)) => {
                if self.store.test().is_none() || self.exam.is_submitting() {
                    return SessionEffect::Idle;
                }
                self.store
                    .dispatch(TestAction::StreamingError(message.clone()));
                SessionEffect::Abort(message)
            }
            SessionEvent::Tick => {
                if self.exam.tick() {
                    tracing::info!("time is up");
                }
                if let Some(effect) = self.finish_if_time_up() {
                    return effect;
                }
                SessionEffect::Ticked(self.exam.time_left())
            }
            SessionEvent::Command(command) => self.command(command),
        }
    }

    fn command(&mut self, command: ExamCommand) -> SessionEffect {
        let changed = match command {
            ExamCommand::Select(option) => {
                self.exam.select(option, self.store.state().questions())
            }
            ExamCommand::Confirm => self.exam.confirm(self.store.state().questions()),
            ExamCommand::Previous => self.exam.previous(self.store.state().questions()),
            ExamCommand::Next => {
                let state = self.store.state();
                match self.exam.next(state.questions(), state.is_streaming) {
                    Step::Moved(_) => true,
                    Step::Finish => return self.finish(),
                    Step::Waiting => {
                        tracing::debug!("next question has not arrived yet");
                        false
                    }
                    Step::Blocked => false,
                }
            }
            ExamCommand::Quit => {
                if self.exam.is_submitting() {
                    return SessionEffect::Idle;
                }
                self.store.dispatch(TestAction::Clear);
                self.sync();
                return SessionEffect::Exit;
            }
        };

        if changed {
            SessionEffect::Updated
        } else {
            SessionEffect::Idle
        }
    }

    fn after_stream_change(&mut self) -> SessionEffect {
        self.sync();
        let state = self.store.state();
        if state.test.is_some() && !state.is_streaming && state.questions().is_empty() {
            tracing::warn!("stream ended without any usable question");
            self.store
                .dispatch(TestAction::StreamingError(NO_QUESTIONS.to_string()));
            return SessionEffect::Abort(NO_QUESTIONS.to_string());
        }
        self.finish_if_time_up().unwrap_or(SessionEffect::Updated)
    }

    fn sync(&mut self) {
        let meta = self.store.test().map(|t| t.meta.clone());
        self.exam.sync_test(meta.as_ref());
        self.exam.follow_current(self.store.state().questions());
    }

    /// A run-out clock forces the finish, but not while still loading.
    fn finish_if_time_up(&mut self) -> Option<SessionEffect> {
        let state = self.store.state();
        if !self.exam.is_time_up()
            || state.is_loading
            || state.test.is_none()
            || state.error.is_some()
        {
            return None;
        }
        match self.finish() {
            SessionEffect::Idle => None,
            effect => Some(effect),
        }
    }

    fn finish(&mut self) -> SessionEffect {
        match self.exam.begin_finish(self.store.state().questions()) {
            Some(card) => SessionEffect::Submit(card),
            None => SessionEffect::Idle,
        }
    }

    /// The submit for the last [`SessionEffect::Submit`] has settled.
    pub fn finish_submitted(&mut self) {
        self.exam.complete_finish();
        self.store.dispatch(TestAction::Clear);
        self.sync();
    }
}
