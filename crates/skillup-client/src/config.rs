//! Client configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use skillup_core::exam::ExamConfig;

const CONFIG_FILE: &str = "skillup.toml";

/// Top-level skillup configuration.
///
/// Note: Custom Debug impl masks the auth token.
#[derive(Clone, Serialize, Deserialize)]
pub struct SkillupConfig {
    /// Backend base URL, including the `/api` prefix.
    #[serde(default = "default_api_url")]
    pub api_base_url: String,
    /// Signed-in user id.
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Opaque bearer token sent with every request.
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Preferred language for generated tests.
    #[serde(default = "default_language")]
    pub language: String,
    /// Timeout for non-streaming requests.
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub exam: ExamConfig,
    /// Fallbacks for `skillup take` when flags are omitted.
    #[serde(default)]
    pub defaults: TestDefaults,
}

/// Default test coordinates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestDefaults {
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub subposition: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

impl std::fmt::Debug for SkillupConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillupConfig")
            .field("api_base_url", &self.api_base_url)
            .field("uid", &self.uid)
            .field("email", &self.email)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "***"))
            .field("language", &self.language)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("exam", &self.exam)
            .field("defaults", &self.defaults)
            .finish()
    }
}

fn default_api_url() -> String {
    "http://localhost:4000/api".to_string()
}
fn default_language() -> String {
    "en".to_string()
}
fn default_timeout() -> u64 {
    30
}

impl Default for SkillupConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_url(),
            uid: None,
            email: None,
            auth_token: None,
            language: default_language(),
            request_timeout_secs: default_timeout(),
            exam: ExamConfig::default(),
            defaults: TestDefaults::default(),
        }
    }
}

impl SkillupConfig {
    /// The configured uid, or an error naming how to set one.
    pub fn require_uid(&self) -> Result<&str> {
        self.uid
            .as_deref()
            .filter(|uid| !uid.is_empty())
            .context("no user id configured (set `uid` in skillup.toml or SKILLUP_UID)")
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

fn resolve_optional(value: &mut Option<String>) {
    if let Some(v) = value.as_mut() {
        *v = resolve_env_vars(v);
    }
    if value.as_deref() == Some("") {
        *value = None;
    }
}

/// Apply `SKILLUP_*` overrides from `lookup`.
fn apply_env_overrides(config: &mut SkillupConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(url) = lookup("SKILLUP_API_URL") {
        config.api_base_url = url;
    }
    if let Some(uid) = lookup("SKILLUP_UID") {
        config.uid = Some(uid);
    }
    if let Some(token) = lookup("SKILLUP_TOKEN") {
        config.auth_token = Some(token);
    }
    if let Some(language) = lookup("SKILLUP_LANGUAGE") {
        config.language = language;
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `skillup.toml` in the current directory
/// 2. `~/.config/skillup/config.toml`
///
/// Environment variable overrides: `SKILLUP_API_URL`, `SKILLUP_UID`,
/// `SKILLUP_TOKEN`, `SKILLUP_LANGUAGE`.
pub fn load_config_from(path: Option<&Path>) -> Result<SkillupConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => {
            let local = PathBuf::from(CONFIG_FILE);
            if local.exists() {
                Some(local)
            } else {
                dirs_path()
                    .map(|dir| dir.join("config.toml"))
                    .filter(|global| global.exists())
            }
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<SkillupConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => SkillupConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    config.api_base_url = resolve_env_vars(&config.api_base_url)
        .trim_end_matches('/')
        .to_string();
    resolve_optional(&mut config.uid);
    resolve_optional(&mut config.email);
    resolve_optional(&mut config.auth_token);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("skillup"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_SKILLUP_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_SKILLUP_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_SKILLUP_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_SKILLUP_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("broken ${"), "broken ${");
        std::env::remove_var("_SKILLUP_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = SkillupConfig::default();
        assert_eq!(config.api_base_url, "http://localhost:4000/api");
        assert_eq!(config.language, "en");
        assert_eq!(config.exam.duration_secs, 600);
        assert!(config.require_uid().is_err());
    }

    #[test]
    fn parse_config_file() {
        let toml_str = r#"
api_base_url = "https://skillup.example.com/api"
uid = "user-42"
auth_token = "secret-token"
language = "uk"

[exam]
duration_secs = 300

[defaults]
position = "developer"
level = "middle"
"#;
        let config: SkillupConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.uid.as_deref(), Some("user-42"));
        assert_eq!(config.exam.duration_secs, 300);
        assert_eq!(config.exam.expected_questions, 10);
        assert_eq!(config.defaults.position.as_deref(), Some("developer"));
        assert!(config.defaults.subposition.is_none());
    }

    #[test]
    fn debug_masks_token() {
        let config = SkillupConfig {
            auth_token: Some("secret-token".into()),
            ..SkillupConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-token"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = [
            ("SKILLUP_API_URL", "http://override/api"),
            ("SKILLUP_UID", "env-user"),
            ("SKILLUP_LANGUAGE", "de"),
        ]
        .into_iter()
        .collect();

        let mut config = SkillupConfig::default();
        apply_env_overrides(&mut config, |name| env.get(name).map(|v| v.to_string()));
        assert_eq!(config.api_base_url, "http://override/api");
        assert_eq!(config.uid.as_deref(), Some("env-user"));
        assert_eq!(config.language, "de");
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "api_base_url = \"http://example.test/api/\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var("SKILLUP_API_URL").is_err() {
            assert_eq!(config.api_base_url, "http://example.test/api");
        }
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let err = load_config_from(Some(Path::new("/nonexistent/skillup.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skillup.toml");
        std::fs::write(&path, "exam = \"not a table\"").unwrap();
        let err = load_config_from(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse config"));
    }
}
