//! Core data model types for skillup.
//!
//! These are the canonical shapes every layer works with once AI output has
//! been normalized: questions, answer options, and test metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of answer options every question carries.
pub const OPTION_COUNT: usize = 4;

/// Identifier of an answer option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionId {
    A,
    B,
    C,
    D,
}

impl OptionId {
    /// All option ids in display order.
    pub const ALL: [OptionId; OPTION_COUNT] = [OptionId::A, OptionId::B, OptionId::C, OptionId::D];

    /// Map a 0-based position to an option id.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// 0-based position of this option.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn letter(self) -> char {
        match self {
            OptionId::A => 'A',
            OptionId::B => 'B',
            OptionId::C => 'C',
            OptionId::D => 'D',
        }
    }

    /// Map a letter (any case) to an option id.
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'A' => Some(OptionId::A),
            'B' => Some(OptionId::B),
            'C' => Some(OptionId::C),
            'D' => Some(OptionId::D),
            _ => None,
        }
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for OptionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                OptionId::from_letter(c).ok_or_else(|| format!("unknown option: {trimmed}"))
            }
            _ => Err(format!("unknown option: {trimmed}")),
        }
    }
}

/// A single answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
}

impl AnswerOption {
    /// Placeholder used when the generator supplied no usable text.
    pub fn placeholder(id: OptionId) -> Self {
        Self {
            id,
            text: format!("Option {id}"),
        }
    }
}

/// A normalized multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Numeric-like identifier assigned by the generator.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Optional code snippet shown with the question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Exactly four options labelled A through D.
    pub options: [AnswerOption; OPTION_COUNT],
    pub correct_answer: OptionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// Look up the option with the given id.
    pub fn option(&self, id: OptionId) -> &AnswerOption {
        &self.options[id.index()]
    }

    pub fn is_correct(&self, answer: OptionId) -> bool {
        self.correct_answer == answer
    }
}

/// Identifying metadata for a test, shared by requests and results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestMeta {
    #[serde(default = "default_test_number")]
    pub test_number: u32,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub subposition: String,
    #[serde(default)]
    pub level: String,
}

fn default_test_number() -> u32 {
    1
}

impl TestMeta {
    /// Identity of a test: a new key means a fresh exam.
    pub fn key(&self) -> String {
        format!("{}-{}", self.section, self.test_number)
    }
}

/// Body of a test creation request (streaming or not).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRequest {
    #[serde(flatten)]
    pub meta: TestMeta,
    /// UI language preference forwarded to the generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Result payload posted when an exam finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResultSubmission {
    pub section_id: String,
    pub correct_answers: usize,
    pub total_questions: usize,
    pub position: String,
    pub subposition: String,
    pub level: String,
    pub test_number: u32,
}

impl TestResultSubmission {
    pub fn new(meta: &TestMeta, correct_answers: usize, total_questions: usize) -> Self {
        Self {
            section_id: meta.section.clone(),
            correct_answers,
            total_questions,
            position: meta.position.clone(),
            subposition: meta.subposition.clone(),
            level: meta.level.clone(),
            test_number: meta.test_number,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_id_parse_and_display() {
        assert_eq!("b".parse::<OptionId>().unwrap(), OptionId::B);
        assert_eq!(" D ".parse::<OptionId>().unwrap(), OptionId::D);
        assert!("E".parse::<OptionId>().is_err());
        assert!("AB".parse::<OptionId>().is_err());
        assert_eq!(OptionId::C.to_string(), "C");
        assert_eq!(OptionId::from_index(3), Some(OptionId::D));
        assert_eq!(OptionId::from_index(4), None);
    }

    #[test]
    fn question_serializes_camel_case() {
        let q = Question {
            id: "1".into(),
            question: "What is 2 + 2?".into(),
            code: None,
            options: OptionId::ALL.map(AnswerOption::placeholder),
            correct_answer: OptionId::B,
            explanation: None,
        };
        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["correctAnswer"], "B");
        assert_eq!(json["options"][2]["id"], "C");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn create_request_flattens_meta() {
        let req = CreateTestRequest {
            meta: TestMeta {
                test_number: 3,
                section: "sec-1".into(),
                position: "dev".into(),
                subposition: "backend".into(),
                level: "junior".into(),
            },
            language: Some("uk".into()),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["testNumber"], 3);
        assert_eq!(json["subposition"], "backend");
        assert_eq!(json["language"], "uk");
        assert_eq!(req.meta.key(), "sec-1-3");
    }
}
