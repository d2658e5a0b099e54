use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub llm_config: LlmConfig,
    #[serde(default)]
    pub ui_config: UiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    12393
}

fn default_static_dir() -> String {
    "static".to_string()
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

/// Remote model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Inline key; usually `${GEMINI_API_KEY}` so the file holds no secret.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_conversion_temperature")]
    pub conversion_temperature: f32,
    #[serde(default)]
    pub format_temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_provider() -> String {
    "gemini_llm".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_conversion_temperature() -> f32 {
    0.1
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            conversion_temperature: default_conversion_temperature(),
            format_temperature: 0.0,
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl LlmConfig {
    /// The API key from the config file, else from `api_key_env`.
    /// Unresolved `${VAR}` placeholders count as missing.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
            .map(str::to_string)
            .or_else(|| {
                std::env::var(&self.api_key_env)
                    .ok()
                    .filter(|key| !key.trim().is_empty())
            })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    #[serde(default = "default_error_dismiss_secs")]
    pub error_dismiss_secs: u64,
    #[serde(default = "default_copy_feedback_secs")]
    pub copy_feedback_secs: u64,
}

fn default_error_dismiss_secs() -> u64 {
    5
}

fn default_copy_feedback_secs() -> u64 {
    2
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            error_dismiss_secs: default_error_dismiss_secs(),
            copy_feedback_secs: default_copy_feedback_secs(),
        }
    }
}

impl UiConfig {
    pub fn error_dismiss(&self) -> Duration {
        Duration::from_secs(self.error_dismiss_secs)
    }

    pub fn copy_feedback(&self) -> Duration {
        Duration::from_secs(self.copy_feedback_secs)
    }
}

impl Config {
    /// Load a YAML or JSON config file (chosen by extension), substituting
    /// `${VAR}` placeholders from the environment first.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = read_config_text(path)?;
        Self::parse(&content, path)
            .with_context(|| format!("Failed to parse configuration file: {}", path.display()))
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let content = substitute_env_vars(content);
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        if is_json {
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(serde_yaml::from_str(&content)?)
        }
    }

    /// Paths tried at startup, in order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf));

        let mut paths: Vec<PathBuf> = std::env::var("CONFIG_PATH")
            .ok()
            .map(PathBuf::from)
            .into_iter()
            .collect();
        paths.push(PathBuf::from("conf.yaml"));
        paths.push(PathBuf::from("conf.json"));
        if let Some(dir) = exe_dir {
            paths.push(dir.join("conf.yaml"));
            paths.push(dir.join("conf.json"));
        }
        paths
    }
}

/// Read a config file as UTF-8, dropping a BOM if present.
fn read_config_text(path: &Path) -> Result<String> {
    let bytes = fs::read(path)
        .with_context(|| format!("Configuration file not found: {}", path.display()))?;
    let (content, _, had_errors) = encoding_rs::UTF_8.decode(&bytes);
    if had_errors {
        warn!("Configuration file {} contains invalid UTF-8", path.display());
    }
    Ok(content.into_owned())
}

/// Replace `${VAR}` with the value of `VAR`; unset variables are left as-is.
pub fn substitute_env_vars(content: &str) -> String {
    let pattern = Regex::new(r"\$\{(\w+)\}").expect("placeholder pattern is valid");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}
