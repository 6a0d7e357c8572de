//! The `skillup normalize` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::Value;

use skillup_client::stream::StreamDecoder;
use skillup_core::model::TestMeta;
use skillup_core::normalize::normalize_questions;
use skillup_core::questions::QuestionList;
use skillup_core::store::test_from_payload;
use skillup_core::traits::StreamEvent;

pub fn execute(input: PathBuf) -> Result<()> {
    let content = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let questions = normalize_content(&content)?;

    tracing::info!("normalized {} questions", questions.len());
    println!("{}", serde_json::to_string_pretty(&questions)?);
    Ok(())
}

/// Normalize a JSON test payload or a saved `data: ` stream transcript.
fn normalize_content(content: &str) -> Result<QuestionList> {
    if content.trim_start().starts_with("data:") {
        let mut decoder = StreamDecoder::new();
        let mut events = decoder.push(content.as_bytes());
        events.extend(decoder.finish());

        let raw: Vec<Value> = events
            .into_iter()
            .filter_map(|event| match event {
                StreamEvent::Question(value) => Some(value),
                _ => None,
            })
            .collect();
        return Ok(normalize_questions(&raw).into_iter().collect());
    }

    let value: Value = serde_json::from_str(content)
        .context("input is neither JSON nor a stream transcript")?;
    Ok(test_from_payload(TestMeta::default(), value).questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_is_decoded_and_deduplicated() {
        let transcript = concat!(
            "data: {\"type\":\"question\",\"data\":{\"id\":\"2\",\"question\":\"old\"}}\n",
            "data: {\"type\":\"question\",\"data\":{\"id\":\"1\",\"question\":\"first\"}}\n",
            "data: {\"type\":\"question\",\"data\":{\"id\":\"2\",\"question\":\"new\"}}\n",
            "data: {\"type\":\"complete\"}\n",
        );
        let questions = normalize_content(transcript).unwrap();
        assert_eq!(questions.ids(), vec!["1", "2"]);
        assert_eq!(questions[1].question, "new");
    }

    #[test]
    fn json_payload() {
        let questions =
            normalize_content(r#"{"questions": [{"id": 1, "text": "from text", "answers": ["x"]}]}"#)
                .unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options[1].text, "Option B");
    }

    #[test]
    fn garbage_is_an_error() {
        assert!(normalize_content("not json").is_err());
    }
}
