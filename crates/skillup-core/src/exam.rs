//! Exam state machine.
//!
//! Tracks navigation, answer selection and locking, the countdown timer, and
//! the submit guard for one test. The exam never owns the questions: every
//! operation takes the current question slice, because questions keep
//! arriving (and re-sorting) while the user is already answering.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{OptionId, Question, TestMeta};
use crate::scoring::{score, ScoreCard};
use crate::store::TestState;

/// Default exam length: ten minutes.
pub const DEFAULT_DURATION_SECS: u32 = 600;

/// Failure reported when the stream ends without a usable question.
pub const NO_QUESTIONS: &str = "no questions were generated";

/// Number of questions the generator is asked for.
pub const DEFAULT_EXPECTED_QUESTIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamConfig {
    #[serde(default = "default_duration")]
    pub duration_secs: u32,
    #[serde(default = "default_expected")]
    pub expected_questions: usize,
}

fn default_duration() -> u32 {
    DEFAULT_DURATION_SECS
}

fn default_expected() -> usize {
    DEFAULT_EXPECTED_QUESTIONS
}

impl Default for ExamConfig {
    fn default() -> Self {
        Self {
            duration_secs: DEFAULT_DURATION_SECS,
            expected_questions: DEFAULT_EXPECTED_QUESTIONS,
        }
    }
}

/// Answer state of the current question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Unselected,
    Selected(OptionId),
    /// Confirmed and locked; the correct answer is shown.
    Revealed { chosen: OptionId, correct: bool },
}

/// Where the exam is, as presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExamPhase {
    /// No question to show yet.
    Loading,
    Answering { index: usize, selection: Selection },
    /// A submit is in flight.
    Finishing,
    Failed(String),
    Cleared,
}

/// Result of asking to move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Moved(usize),
    /// Past the last question of a finished stream.
    Finish,
    /// The next question has not arrived yet.
    Waiting,
    /// The current question is not confirmed.
    Blocked,
}

#[derive(Debug, Clone)]
pub struct Exam {
    config: ExamConfig,
    test_key: Option<String>,
    index: usize,
    current_id: Option<String>,
    selected: Option<OptionId>,
    confirmed: bool,
    answers: HashMap<String, OptionId>,
    time_left: u32,
    time_up: bool,
    submitting: bool,
    finished: bool,
}

impl Exam {
    pub fn new(config: ExamConfig) -> Self {
        Self {
            config,
            test_key: None,
            index: 0,
            current_id: None,
            selected: None,
            confirmed: false,
            answers: HashMap::new(),
            time_left: config.duration_secs,
            time_up: false,
            submitting: false,
            finished: false,
        }
    }

    pub fn config(&self) -> &ExamConfig {
        &self.config
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn answers(&self) -> &HashMap<String, OptionId> {
        &self.answers
    }

    pub fn time_left(&self) -> u32 {
        self.time_left
    }

    pub fn is_time_up(&self) -> bool {
        self.time_up
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn selection(&self, questions: &[Question]) -> Selection {
        match (self.selected, self.confirmed) {
            (Some(chosen), true) => Selection::Revealed {
                chosen,
                correct: questions
                    .get(self.index)
                    .is_some_and(|q| q.is_correct(chosen)),
            },
            (Some(chosen), false) => Selection::Selected(chosen),
            (None, _) => Selection::Unselected,
        }
    }

    pub fn phase(&self, state: &TestState) -> ExamPhase {
        if self.submitting {
            return ExamPhase::Finishing;
        }
        if self.finished || state.test.is_none() {
            return ExamPhase::Cleared;
        }
        if let Some(error) = &state.error {
            return ExamPhase::Failed(error.clone());
        }
        let questions = state.questions();
        if questions.is_empty() && !state.is_streaming && !state.is_loading {
            return ExamPhase::Failed(NO_QUESTIONS.to_string());
        }
        if state.is_generating() || self.index >= questions.len() {
            return ExamPhase::Loading;
        }
        ExamPhase::Answering {
            index: self.index,
            selection: self.selection(questions),
        }
    }

    /// Track the test identity; a new test resets navigation, answers and
    /// the timer.
    pub fn sync_test(&mut self, meta: Option<&TestMeta>) {
        let Some(meta) = meta else {
            self.test_key = None;
            return;
        };
        let key = meta.key();
        if self.test_key.as_deref() != Some(key.as_str()) {
            tracing::debug!("new test {key}, resetting exam");
            self.reset();
            self.test_key = Some(key);
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.current_id = None;
        self.selected = None;
        self.confirmed = false;
        self.answers.clear();
        self.time_left = self.config.duration_secs;
        self.time_up = false;
        self.submitting = false;
        self.finished = false;
    }

    /// Keep the cursor on the question the user is working on when arrivals
    /// re-sort the list. Before any interaction the cursor stays by index.
    pub fn follow_current(&mut self, questions: &[Question]) {
        let Some(id) = &self.current_id else {
            return;
        };
        if let Some(position) = questions.iter().position(|q| &q.id == id) {
            self.index = position;
        }
    }

    /// Pick an option. Ignored once the answer is confirmed.
    pub fn select(&mut self, option: OptionId, questions: &[Question]) -> bool {
        if self.confirmed || self.submitting || self.finished {
            return false;
        }
        let Some(question) = questions.get(self.index) else {
            return false;
        };
        self.current_id = Some(question.id.clone());
        self.selected = Some(option);
        true
    }

    /// Lock in the selected option and record it.
    pub fn confirm(&mut self, questions: &[Question]) -> bool {
        if self.confirmed || self.submitting {
            return false;
        }
        let (Some(selected), Some(question)) = (self.selected, questions.get(self.index)) else {
            return false;
        };
        self.answers.insert(question.id.clone(), selected);
        self.confirmed = true;
        true
    }

    pub fn next(&mut self, questions: &[Question], streaming: bool) -> Step {
        if !self.confirmed || self.submitting {
            return Step::Blocked;
        }
        let next = self.index + 1;
        if next < questions.len() {
            self.move_to(next, questions);
            return Step::Moved(next);
        }
        if streaming {
            return Step::Waiting;
        }
        Step::Finish
    }

    pub fn previous(&mut self, questions: &[Question]) -> bool {
        if self.index == 0 || self.submitting {
            return false;
        }
        self.move_to(self.index - 1, questions);
        true
    }

    /// Move the cursor and restore any answer saved for that question.
    fn move_to(&mut self, index: usize, questions: &[Question]) {
        self.index = index;
        let question = questions.get(index);
        self.current_id = question.map(|q| q.id.clone());
        let saved = question.and_then(|q| self.answers.get(&q.id)).copied();
        self.selected = saved;
        self.confirmed = saved.is_some();
    }

    /// Advance the timer by one second. Returns `true` on the tick that runs
    /// the clock out.
    pub fn tick(&mut self) -> bool {
        if self.time_up || self.submitting || self.finished {
            return false;
        }
        if self.time_left <= 1 {
            self.time_left = 0;
            self.time_up = true;
            return true;
        }
        self.time_left -= 1;
        false
    }

    /// Start finishing: score the answers and raise the submit guard.
    /// Returns `None` if a finish is already in flight.
    pub fn begin_finish(&mut self, questions: &[Question]) -> Option<ScoreCard> {
        if self.submitting || self.finished {
            return None;
        }
        self.submitting = true;
        let card = score(questions, &self.answers, self.time_up);
        tracing::info!(
            "test results: {}/{} ({}%)",
            card.correct,
            card.total,
            card.percentage
        );
        Some(card)
    }

    /// The submit has settled (successfully or not).
    pub fn complete_finish(&mut self) {
        self.submitting = false;
        self.finished = true;
    }
}
