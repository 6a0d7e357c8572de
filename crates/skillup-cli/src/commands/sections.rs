//! The `skillup sections` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use skillup_client::resources::MAX_SECTION_PROGRESS;
use skillup_client::{load_config_from, ApiClient};

pub async fn execute(subposition: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let subposition = subposition
        .or_else(|| config.defaults.subposition.clone())
        .context("missing --subposition (or set `subposition` under [defaults] in skillup.toml)")?;

    let client = ApiClient::from_config(&config)?;
    let mut sections = client
        .sections(&subposition, config.uid.as_deref())
        .await
        .with_context(|| format!("failed to load sections for {subposition}"))?;
    sections.sort_by_key(|s| s.order);

    if sections.is_empty() {
        println!("No sections found for {subposition}.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Id", "Title", "Progress", "Next test"]);
    for section in &sections {
        let next = if section.is_complete() {
            "done".to_string()
        } else {
            section.next_test_number().to_string()
        };
        table.add_row(vec![
            section.order.to_string(),
            section.id.clone(),
            section.title.clone(),
            format!("{}/{MAX_SECTION_PROGRESS}", section.progress),
            next,
        ]);
    }
    println!("{table}");
    Ok(())
}
