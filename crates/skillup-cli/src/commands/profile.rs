//! The `skillup profile` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::Table;

use skillup_client::resources::{UserProfile, UserUpdate, MAX_SECTION_PROGRESS};
use skillup_client::{load_config_from, ApiClient};

use crate::ProfileAction;

pub async fn execute(action: ProfileAction, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let uid = config.require_uid()?;
    let client = ApiClient::from_config(&config)?;

    match action {
        ProfileAction::Show => {
            let profile = client.get_user(uid).await.context("failed to load profile")?;
            print_profile(&profile);
        }
        ProfileAction::Sync => {
            let profile = client
                .sync_user(uid, config.email.as_deref())
                .await
                .context("failed to sync profile")?;
            println!("Profile synced.");
            print_profile(&profile);
        }
        ProfileAction::Update {
            name,
            email,
            position,
            subposition,
            level,
        } => {
            let update = UserUpdate {
                email,
                name,
                position,
                subposition,
                level,
            };
            if update.is_empty() {
                anyhow::bail!("nothing to update, pass at least one field");
            }
            let profile = client
                .update_user(uid, &update)
                .await
                .context("failed to update profile")?;
            println!("Profile updated.");
            print_profile(&profile);
        }
        ProfileAction::Delete { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete {uid} without --yes");
            }
            let response = client
                .delete_user(uid)
                .await
                .context("failed to delete profile")?;
            if response.message.is_empty() {
                println!("Profile {uid} deleted.");
            } else {
                println!("{}", response.message);
            }
        }
    }
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    let or_dash = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".to_string());

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["uid".to_string(), profile.uid.clone()]);
    table.add_row(vec!["email".to_string(), or_dash(&profile.email)]);
    table.add_row(vec!["name".to_string(), or_dash(&profile.name)]);
    table.add_row(vec!["position".to_string(), or_dash(&profile.position)]);
    table.add_row(vec!["subposition".to_string(), or_dash(&profile.subposition)]);
    table.add_row(vec!["level".to_string(), or_dash(&profile.level)]);
    if let Some(progress) = &profile.progress {
        table.add_row(vec![
            "tests taken".to_string(),
            progress.tests_taken.to_string(),
        ]);
    }
    if let Some(stats) = &profile.questions_stats {
        table.add_row(vec![
            "accuracy".to_string(),
            format!(
                "{:.1}% ({}/{})",
                stats.accuracy_percentage,
                stats.total_correct_answers,
                stats.total_questions_answered
            ),
        ]);
    }
    if let Some(updated) = profile.updated_at {
        table.add_row(vec![
            "updated".to_string(),
            updated.format("%Y-%m-%d %H:%M UTC").to_string(),
        ]);
    }
    println!("{table}");

    if !profile.sections.is_empty() {
        let mut sections = Table::new();
        sections.set_header(vec!["Section", "Progress"]);
        let mut ordered: Vec<_> = profile.sections.iter().collect();
        ordered.sort_by_key(|s| s.order);
        for section in ordered {
            let title = if section.title.is_empty() {
                section.section_id.clone()
            } else {
                section.title.clone()
            };
            sections.add_row(vec![
                title,
                format!("{}/{MAX_SECTION_PROGRESS}", section.progress),
            ]);
        }
        println!("{sections}");
    }
}
