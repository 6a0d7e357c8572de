//! Defensive normalization of AI-generated questions.
//!
//! The generator is a language model, so the shape of each question varies
//! from run to run: options arrive as arrays, keyed maps, or under other
//! field names; the correct answer may be a letter, a word, or an index;
//! text fields are sometimes nested objects. Everything here coerces that
//! output into the canonical [`Question`] or rejects it outright.

use serde_json::{Map, Number, Value};

use crate::model::{AnswerOption, OptionId, Question, OPTION_COUNT};

/// Depth past which nested values collapse to a marker.
const MAX_DEPTH: usize = 3;

const NESTED_MARKER: &str = "[nested]";

/// Default length cap for flattened values.
pub const DEFAULT_SHORT_LEN: usize = 140;

const QUESTION_FLATTEN_LEN: usize = 500;
const OPTION_FLATTEN_LEN: usize = 200;
const ARRAY_ITEM_LEN: usize = 50;
const CODE_FLATTEN_LEN: usize = 2000;
const MAX_TEXT_LEN: usize = 1000;

/// Keys probed, in order, when an object stands in for a piece of text.
const TEXT_KEYS: &[&str] = &[
    "text",
    "value",
    "label",
    "title",
    "content",
    "answer",
    "explanation",
    "name",
    "description",
];

/// Keys probed, in order, for the text of an option object.
const OPTION_TEXT_KEYS: &[&str] = &["text", "value", "answer", "label"];

/// Alternate field names for the option list.
const OPTION_LIST_KEYS: &[&str] = &["answers", "choices"];

/// Fields that may carry the correct answer as a string.
const CORRECT_KEYS: &[&str] = &["correctAnswer", "correct", "answer"];

/// Flatten an arbitrary JSON value into a short, display-safe string.
///
/// Strings longer than `max_len` characters are cut and suffixed with `…`.
/// Arrays join their first three items; objects use their first textual
/// field or fall back to compact JSON. Recursion is bounded.
pub fn to_short_string(value: &Value, max_len: usize) -> String {
    short_string(value, max_len, 0)
}

fn short_string(value: &Value, max_len: usize, depth: usize) -> String {
    if depth > MAX_DEPTH {
        return NESTED_MARKER.to_string();
    }

    match value {
        Value::String(s) => truncate_with_ellipsis(s, max_len),
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(n),
        Value::Array(items) => items
            .iter()
            .take(3)
            .map(|item| short_string(item, ARRAY_ITEM_LEN, depth + 1))
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) => {
            for key in TEXT_KEYS {
                if let Some(text @ Value::String(_)) = map.get(*key) {
                    return short_string(text, max_len, depth + 1);
                }
            }
            truncate_with_ellipsis(&value.to_string(), max_len)
        }
    }
}

fn truncate_with_ellipsis(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let mut out: String = s.chars().take(max_len.saturating_sub(1)).collect();
        out.push('…');
        out
    } else {
        s.to_string()
    }
}

fn truncate_chars(s: &str, max_len: usize) -> String {
    s.chars().take(max_len).collect()
}

/// Render a number the way the generator's ids look: `3`, not `3.0`.
fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

/// Truthiness of a JSON value, as used for optional payload fields.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Normalize one raw question. Returns `None` when the input has no usable
/// question text.
pub fn normalize_question(input: &Value) -> Option<Question> {
    let Some(obj) = input.as_object() else {
        tracing::warn!("skipping non-object question payload: {}", kind_of(input));
        return None;
    };

    let question = question_text(obj);
    if question.trim().is_empty() {
        tracing::debug!(
            "skipping question without text: {}",
            to_short_string(input, DEFAULT_SHORT_LEN)
        );
        return None;
    }

    let options = normalize_options(obj);
    let correct_answer = correct_answer(obj, &options);

    Some(Question {
        id: question_id(obj),
        question: truncate_chars(&question, MAX_TEXT_LEN),
        code: code_block(obj),
        options,
        correct_answer,
        explanation: explanation(obj),
    })
}

/// Normalize a batch, dropping unusable entries.
pub fn normalize_questions<'a>(inputs: impl IntoIterator<Item = &'a Value>) -> Vec<Question> {
    inputs.into_iter().filter_map(normalize_question).collect()
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn question_text(obj: &Map<String, Value>) -> String {
    match obj.get("question") {
        Some(Value::String(s)) => s.clone(),
        Some(nested @ (Value::Object(_) | Value::Array(_))) => {
            to_short_string(nested, QUESTION_FLATTEN_LEN)
        }
        _ => ["text", "title"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .unwrap_or_default()
            .to_string(),
    }
}

/// Collect raw option entries from whichever field the generator used.
///
/// `options` wins over the alternate names. Each may be an array or a map
/// keyed by option id, in which case key order is kept.
fn raw_options(obj: &Map<String, Value>) -> Vec<Value> {
    std::iter::once("options")
        .chain(OPTION_LIST_KEYS.iter().copied())
        .find_map(|key| match obj.get(key) {
            Some(Value::Array(items)) => Some(items.clone()),
            Some(Value::Object(map)) => Some(keyed_options(map)),
            _ => None,
        })
        .unwrap_or_default()
}

fn keyed_options(map: &Map<String, Value>) -> Vec<Value> {
    map.iter()
        .map(|(id, text)| {
            let mut entry = Map::new();
            entry.insert("id".into(), Value::String(id.clone()));
            entry.insert("text".into(), text.clone());
            Value::Object(entry)
        })
        .collect()
}

fn option_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Object(map) => {
            let source = OPTION_TEXT_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|v| !v.is_null())
                .unwrap_or(raw);
            to_short_string(source, OPTION_FLATTEN_LEN)
        }
        other => to_short_string(other, OPTION_FLATTEN_LEN),
    }
}

/// Build exactly four options with ids A-D, padding or truncating as needed.
fn normalize_options(obj: &Map<String, Value>) -> [AnswerOption; OPTION_COUNT] {
    let raw = raw_options(obj);
    OptionId::ALL.map(|id| match raw.get(id.index()) {
        Some(entry) => {
            let text = option_text(entry);
            if text.is_empty() {
                AnswerOption::placeholder(id)
            } else {
                AnswerOption { id, text }
            }
        }
        None => AnswerOption::placeholder(id),
    })
}

fn correct_answer(obj: &Map<String, Value>, options: &[AnswerOption; OPTION_COUNT]) -> OptionId {
    let raw = CORRECT_KEYS
        .iter()
        .find_map(|key| obj.get(*key).and_then(Value::as_str));

    if let Some(raw) = raw {
        return resolve_correct_text(raw, options);
    }

    match obj.get("correctAnswer").and_then(Value::as_f64) {
        Some(index) if index.is_finite() && index >= 0.0 => {
            OptionId::from_index(index.trunc() as usize).unwrap_or(OptionId::A)
        }
        _ => OptionId::A,
    }
}

/// Resolve a textual answer: an exact letter, an option's own text, or the
/// first A-D letter found anywhere in the string.
fn resolve_correct_text(raw: &str, options: &[AnswerOption; OPTION_COUNT]) -> OptionId {
    let trimmed = raw.trim();
    if let Ok(id) = trimmed.parse::<OptionId>() {
        return id;
    }

    if let Some(option) = options
        .iter()
        .find(|o| o.text.trim().eq_ignore_ascii_case(trimmed))
    {
        return option.id;
    }

    trimmed
        .to_uppercase()
        .chars()
        .find_map(|c| match c {
            'A'..='D' => OptionId::from_letter(c),
            _ => None,
        })
        .unwrap_or(OptionId::A)
}

fn question_id(obj: &Map<String, Value>) -> String {
    match obj.get("id") {
        None | Some(Value::Null) => "1".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => to_short_string(other, DEFAULT_SHORT_LEN),
    }
}

fn code_block(obj: &Map<String, Value>) -> Option<String> {
    let code = obj.get("code").filter(|v| is_truthy(v))?;
    Some(match code {
        Value::String(s) => s.clone(),
        other => to_short_string(other, CODE_FLATTEN_LEN),
    })
}

fn explanation(obj: &Map<String, Value>) -> Option<String> {
    let text = match obj.get("explanation") {
        Some(Value::String(s)) => s.clone(),
        Some(nested @ (Value::Object(_) | Value::Array(_))) => {
            to_short_string(nested, QUESTION_FLATTEN_LEN)
        }
        _ => String::new(),
    };
    let text = truncate_chars(&text, MAX_TEXT_LEN);
    (!text.is_empty()).then_some(text)
}
