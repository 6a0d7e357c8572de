//! The `skillup init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("skillup.toml").exists() {
        println!("skillup.toml already exists, skipping.");
    } else {
        std::fs::write("skillup.toml", SAMPLE_CONFIG)?;
        println!("Created skillup.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit skillup.toml with your backend URL and user id");
    println!("  2. Run: skillup positions");
    println!("  3. Run: skillup take --section <id>");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# skillup configuration

api_base_url = "http://localhost:4000/api"
uid = "${SKILLUP_UID}"
auth_token = "${SKILLUP_TOKEN}"
language = "en"
request_timeout_secs = 30

[exam]
duration_secs = 600
expected_questions = 10

[defaults]
position = "developer"
subposition = "frontend"
level = "junior"
"#;
