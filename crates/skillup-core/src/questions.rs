//! Ordered, id-deduplicated question list.
//!
//! Questions can arrive in any order and the generator may resend a question
//! with a corrected payload. The list keeps one entry per id and always
//! presents them ascending by numeric id.

use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::Question;

/// What happened to a question handed to [`QuestionList::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new id was appended.
    Added,
    /// An existing entry was replaced in place.
    Replaced,
}

/// Questions of a test, unique by id, sorted by numeric id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionList {
    questions: Vec<Question>,
}

/// Sort key for a question id: an optional sign and its leading decimal
/// digits, 0 when there are none. Runs too long for `i64` saturate.
pub fn numeric_id(id: &str) -> i64 {
    let trimmed = id.trim_start();
    let (negative, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let digits = &rest[..end];
    if digits.is_empty() {
        return 0;
    }
    match digits.parse::<i64>() {
        Ok(n) if negative => -n,
        Ok(n) => n,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    }
}

impl QuestionList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a question, replacing any existing entry with the same id.
    pub fn upsert(&mut self, question: Question) -> Upsert {
        if let Some(existing) = self.questions.iter_mut().find(|q| q.id == question.id) {
            *existing = question;
            return Upsert::Replaced;
        }

        self.questions.push(question);
        // Stable, so ids that share a numeric key keep arrival order.
        self.questions.sort_by_key(|q| numeric_id(&q.id));
        Upsert::Added
    }

    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.questions.iter().map(|q| q.id.as_str()).collect()
    }

    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }
}

impl Deref for QuestionList {
    type Target = [Question];

    fn deref(&self) -> &[Question] {
        &self.questions
    }
}

impl FromIterator<Question> for QuestionList {
    fn from_iter<I: IntoIterator<Item = Question>>(iter: I) -> Self {
        let mut list = QuestionList::new();
        for question in iter {
            list.upsert(question);
        }
        list
    }
}
