pub mod init;
pub mod normalize;
pub mod positions;
pub mod profile;
pub mod sections;
pub mod stream;
pub mod take;

use anyhow::{Context, Result};

use skillup_client::SkillupConfig;
use skillup_core::model::{CreateTestRequest, TestMeta};

use crate::TestArgs;

/// Build a test request from flags, falling back to the config defaults.
pub fn build_request(args: &TestArgs, config: &SkillupConfig) -> Result<CreateTestRequest> {
    let pick = |flag: &Option<String>, fallback: &Option<String>, name: &str| {
        flag.clone()
            .or_else(|| fallback.clone())
            .with_context(|| format!("missing --{name} (or set `{name}` under [defaults] in skillup.toml)"))
    };

    Ok(CreateTestRequest {
        meta: TestMeta {
            test_number: args.test_number,
            section: args.section.clone(),
            position: pick(&args.position, &config.defaults.position, "position")?,
            subposition: pick(&args.subposition, &config.defaults.subposition, "subposition")?,
            level: pick(&args.level, &config.defaults.level, "level")?,
        },
        language: Some(args.language.clone().unwrap_or_else(|| config.language.clone())),
    })
}
