//! Exam scoring and result grading.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{OptionId, Question};

/// Outcome of a finished exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub correct: usize,
    pub total: usize,
    /// Rounded percentage, 0 when there were no questions.
    pub percentage: u32,
    /// The timer forced the finish.
    pub time_up: bool,
}

impl ScoreCard {
    pub fn grade(&self) -> Grade {
        Grade::from_score(self.percentage, self.time_up)
    }
}

/// Count answers matching each question's correct option.
///
/// Unanswered questions count against the total.
pub fn score(
    questions: &[Question],
    answers: &HashMap<String, OptionId>,
    time_up: bool,
) -> ScoreCard {
    let correct = questions
        .iter()
        .filter(|q| answers.get(&q.id).is_some_and(|a| q.is_correct(*a)))
        .count();
    let total = questions.len();

    ScoreCard {
        correct,
        total,
        percentage: percentage(correct, total),
        time_up,
    }
}

fn percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Result banding shown after an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    Excellent,
    Great,
    Good,
    KeepGoing,
    TimeUp,
}

impl Grade {
    pub fn from_score(percentage: u32, time_up: bool) -> Self {
        match percentage {
            _ if time_up => Grade::TimeUp,
            90.. => Grade::Excellent,
            70..=89 => Grade::Great,
            50..=69 => Grade::Good,
            _ => Grade::KeepGoing,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            Grade::Excellent => "You're a master! Keep it up!",
            Grade::Great => "Well done! You're on the right track!",
            Grade::Good => "Not bad, but there's room to grow!",
            Grade::KeepGoing => "Don't give up! Review the material and try again!",
            Grade::TimeUp => "Time ran out. Try again and be quicker!",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grade::Excellent => write!(f, "Excellent"),
            Grade::Great => write!(f, "Great"),
            Grade::Good => write!(f, "Good"),
            Grade::KeepGoing => write!(f, "Keep going"),
            Grade::TimeUp => write!(f, "Time's up"),
        }
    }
}
