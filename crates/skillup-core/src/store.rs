//! Test state container.
//!
//! Holds the test currently being generated or taken. All mutation goes
//! through [`TestStore::dispatch`] with a [`TestAction`], so every update is
//! applied atomically and in the order it was dispatched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{Question, TestMeta};
use crate::normalize::{normalize_question, normalize_questions};
use crate::questions::{QuestionList, Upsert};

/// A test and the questions that have arrived for it so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Test {
    #[serde(flatten)]
    pub meta: TestMeta,
    #[serde(default)]
    pub questions: QuestionList,
}

impl Test {
    pub fn new(meta: TestMeta) -> Self {
        Self {
            meta,
            questions: QuestionList::new(),
        }
    }
}

/// Snapshot of the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestState {
    pub test: Option<Test>,
    /// Nothing usable has arrived yet.
    pub is_loading: bool,
    /// The generator is still sending questions.
    pub is_streaming: bool,
    pub error: Option<String>,
}

impl TestState {
    pub fn questions(&self) -> &[Question] {
        self.test.as_ref().map(|t| t.questions.as_slice()).unwrap_or(&[])
    }

    /// Waiting on the generator with nothing to show.
    pub fn is_generating(&self) -> bool {
        (self.is_loading || self.is_streaming) && self.questions().is_empty()
    }
}

/// State transitions understood by the store.
#[derive(Debug, Clone)]
pub enum TestAction {
    /// A streaming request was opened; starts an empty test.
    StartStreaming(TestMeta),
    /// A raw question arrived from the stream.
    AddQuestion(Value),
    /// The generator reports that enough questions exist to begin.
    InitialReady,
    CompleteStreaming,
    StreamingError(String),
    /// A complete, non-streamed test payload.
    LoadTest { fallback: TestMeta, payload: Value },
    Clear,
    ClearError,
}

#[derive(Debug, Clone, Default)]
pub struct TestStore {
    state: TestState,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TestState {
        &self.state
    }

    pub fn test(&self) -> Option<&Test> {
        self.state.test.as_ref()
    }

    pub fn dispatch(&mut self, action: TestAction) {
        let state = &mut self.state;
        match action {
            TestAction::StartStreaming(meta) => {
                state.is_streaming = true;
                state.is_loading = true;
                state.error = None;
                state.test = Some(Test::new(meta));
            }
            TestAction::AddQuestion(raw) => {
                let Some(test) = state.test.as_mut() else {
                    tracing::debug!("question arrived after the test was cleared, ignoring");
                    return;
                };
                let Some(question) = normalize_question(&raw) else {
                    tracing::warn!("skipping invalid question from stream");
                    return;
                };
                let id = question.id.clone();
                match test.questions.upsert(question) {
                    Upsert::Added => {
                        tracing::info!("added question {id}, total: {}", test.questions.len())
                    }
                    Upsert::Replaced => tracing::info!("updated question {id}"),
                }
            }
            TestAction::InitialReady => {
                state.is_loading = false;
            }
            TestAction::CompleteStreaming => {
                state.is_streaming = false;
                state.is_loading = false;
            }
            TestAction::StreamingError(message) => {
                state.is_streaming = false;
                state.is_loading = false;
                state.error = Some(message);
            }
            TestAction::LoadTest { fallback, payload } => {
                state.is_loading = false;
                state.is_streaming = false;
                state.error = None;
                state.test = Some(test_from_payload(fallback, payload));
            }
            TestAction::Clear => {
                state.test = None;
                state.error = None;
                state.is_streaming = false;
                state.is_loading = false;
            }
            TestAction::ClearError => {
                state.error = None;
            }
        }
    }
}

/// Interpret a non-streamed test response.
///
/// Accepted shapes: a bare question array, `{ "test": { ... } }`, or an
/// object carrying `questions` plus optional metadata. Missing metadata is
/// taken from `fallback`.
pub fn test_from_payload(fallback: TestMeta, payload: Value) -> Test {
    let payload = match payload {
        Value::Object(mut map) if map.get("test").is_some_and(Value::is_object) => {
            map.remove("test").unwrap_or_default()
        }
        other => other,
    };

    match payload {
        Value::Array(items) => Test {
            meta: fallback,
            questions: normalize_questions(&items).into_iter().collect(),
        },
        Value::Object(map) => {
            let meta = TestMeta {
                test_number: map
                    .get("testNumber")
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .unwrap_or(fallback.test_number),
                section: string_field(&map, "section").unwrap_or(fallback.section),
                position: string_field(&map, "position").unwrap_or(fallback.position),
                subposition: string_field(&map, "subposition").unwrap_or(fallback.subposition),
                level: string_field(&map, "level").unwrap_or(fallback.level),
            };
            let questions = map
                .get("questions")
                .and_then(Value::as_array)
                .map(|items| normalize_questions(items).into_iter().collect())
                .unwrap_or_default();
            Test { meta, questions }
        }
        _ => {
            tracing::warn!("unrecognised test payload, starting with no questions");
            Test::new(fallback)
        }
    }
}

fn string_field(map: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).and_then(Value::as_str).map(str::to_string)
}
