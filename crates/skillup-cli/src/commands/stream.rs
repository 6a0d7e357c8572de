//! The `skillup stream` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::sync::mpsc;

use skillup_client::{load_config_from, ApiClient};
use skillup_core::store::{TestAction, TestStore};
use skillup_core::traits::StreamEvent;

use crate::TestArgs;

pub async fn execute(
    test: TestArgs,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let request = super::build_request(&test, &config)?;
    let client = ApiClient::from_config(&config)?;

    let mut store = TestStore::new();
    store.dispatch(TestAction::StartStreaming(request.meta.clone()));

    let (tx, mut rx) = mpsc::channel(64);
    let producer = async move { client.stream_test_events(&request, &tx).await };
    let consumer = async {
        while let Some(event) = rx.recv().await {
            let action = match event {
                StreamEvent::Question(raw) => TestAction::AddQuestion(raw),
                StreamEvent::InitialReady => TestAction::InitialReady,
                StreamEvent::Complete => TestAction::CompleteStreaming,
                StreamEvent::Error(message) => TestAction::StreamingError(message),
            };
            store.dispatch(action);
        }
    };

    let (result, ()) = tokio::join!(producer, consumer);
    result.context("test stream failed")?;

    let test = store.test().context("stream produced no test")?;
    let json = serde_json::to_string_pretty(test)?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote {} questions to {}", test.questions.len(), path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
