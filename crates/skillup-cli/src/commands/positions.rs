//! The `skillup positions` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use skillup_client::{load_config_from, ApiClient};

pub async fn execute(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let client = ApiClient::from_config(&config)?;
    let positions = client
        .positions()
        .await
        .context("failed to load positions")?;

    if positions.is_empty() {
        println!("No positions available.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Position", "Subposition", "Subposition id"]);
    for position in &positions {
        if position.subpositions.is_empty() {
            table.add_row(vec![position.name.as_str(), "-", "-"]);
        }
        for sub in &position.subpositions {
            table.add_row(vec![position.name.as_str(), sub.name.as_str(), sub.id.as_str()]);
        }
    }
    println!("{table}");
    Ok(())
}
