//! REST resources exchanged with the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Highest progress value of a section.
pub const MAX_SECTION_PROGRESS: u32 = 10;

/// A user's profile as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub subposition: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub progress: Option<Progress>,
    #[serde(default)]
    pub questions_stats: Option<QuestionsStats>,
    #[serde(default)]
    pub sections: Vec<UserSection>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Progress {
    pub lessons_completed: u32,
    pub tests_taken: u32,
    pub total_lessons_available: Option<u32>,
    pub progress_percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuestionsStats {
    pub total_questions_answered: u32,
    pub total_correct_answers: u32,
    pub total_incorrect_answers: u32,
    pub accuracy_percentage: f64,
}

/// Per-user progress in one section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSection {
    pub section_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub progress: u32,
}

/// A job position and its specialisations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub subpositions: Vec<Subposition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subposition {
    pub id: String,
    pub name: String,
}

/// A topic grouping of tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
    /// Tests passed so far, 0 to [`MAX_SECTION_PROGRESS`].
    #[serde(default)]
    pub progress: u32,
}

impl Section {
    pub fn is_complete(&self) -> bool {
        self.progress >= MAX_SECTION_PROGRESS
    }

    /// Number of the next test to take in this section.
    pub fn next_test_number(&self) -> u32 {
        (self.progress + 1).min(MAX_SECTION_PROGRESS)
    }
}

/// Partial profile update; unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subposition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self == &UserUpdate::default()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SyncRequest<'a> {
    pub uid: &'a str,
    pub email: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}
