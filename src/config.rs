use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::air::BoundingBox;
use crate::risk::RiskRules;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub air_quality: AirQualityConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub tenders: TendersConfig,
    #[serde(default)]
    pub risk: RiskRules,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirQualityConfig {
    #[serde(default = "default_air_base_url")]
    pub base_url: String,
    #[serde(default, skip_serializing)]
    pub token: String,
    #[serde(default = "default_air_token_env")]
    pub token_env: String,
    #[serde(default = "default_bounds")]
    pub bounds: BoundingBox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ai_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_ai_model")]
    pub model: String,
    #[serde(default, skip_serializing)]
    pub api_key: String,
    #[serde(default = "default_ai_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_ai_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_ai_temperature")]
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TendersConfig {
    /// Empty means the dataset compiled into the binary.
    #[serde(default)]
    pub dataset_path: String,
}

#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub dataset_path: Option<String>,
    pub disable_ai: bool,
}

impl Config {
    pub fn default_path() -> PathBuf {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        home.join(".config/tender-oracle/config.toml")
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(|p| p.to_path_buf())
            .unwrap_or_else(Self::default_path);
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(&path)
            .with_context(|| format!("failed reading config: {}", path.display()))?;
        Self::from_toml(&data)
            .with_context(|| format!("failed parsing TOML config: {}", path.display()))
    }

    pub fn from_toml(data: &str) -> Result<Self> {
        Ok(toml::from_str(data)?)
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.dataset_path {
            self.tenders.dataset_path = path;
        }
        if overrides.disable_ai {
            self.ai.enabled = false;
        }
    }

    pub fn write_template(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed creating config directory: {}", parent.display())
            })?;
        }
        fs::write(path, Self::default_template())
            .with_context(|| format!("failed writing config template: {}", path.display()))
    }

    pub fn resolved_dataset_path(&self) -> Option<PathBuf> {
        let raw = self.tenders.dataset_path.trim();
        if raw.is_empty() {
            None
        } else {
            Some(expand_tilde(raw))
        }
    }

    pub fn default_template() -> String {
        let template = r#"[log]
level = "info"

[server]
host = "127.0.0.1"
port = 3001

[air_quality]
base_url = "https://api.waqi.info"
# token = ""
token_env = "WAQI_TOKEN"
bounds = { south = 43.15, west = 76.75, north = 43.40, east = 77.10 }

[ai]
enabled = true
endpoint = "https://api.openai.com/v1/chat/completions"
model = "gpt-4o-mini"
# api_key = ""
api_key_env = "OPENAI_API_KEY"
timeout_secs = 20
connect_timeout_secs = 5
max_tokens = 400
temperature = 0.3

[tenders]
dataset_path = ""

[risk]
winter_months = [10, 11, 0, 1, 2]
winter_categories = ["construction"]
seasonal_points = 35
major_amount_billions = 2.0
major_amount_points = 25
elevated_amount_billions = 1.0
elevated_amount_points = 15
deadline_window_days = 10
deadline_points = 15
timeline_min_billions = 0.5
months_per_billion = 3.0
timeline_slack = 0.7
timeline_points = 20
combined_min_billions = 1.0
combined_points = 20
medical_advisory_billions = 0.5
"#;
        template.to_string()
    }
}

impl AirQualityConfig {
    /// Inline token wins over the environment variable.
    pub fn resolved_token(&self) -> Option<String> {
        resolve_secret(&self.token, &self.token_env)
    }
}

impl AiConfig {
    /// `None` means no credential is configured, which routes narration to the
    /// local summary.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.enabled {
            return None;
        }
        resolve_secret(&self.api_key, &self.api_key_env)
    }
}

fn resolve_secret(inline: &str, env_name: &str) -> Option<String> {
    let inline = inline.trim();
    if !inline.is_empty() {
        return Some(inline.to_string());
    }
    if env_name.trim().is_empty() {
        return None;
    }
    std::env::var(env_name.trim())
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            base_url: default_air_base_url(),
            token: String::new(),
            token_env: default_air_token_env(),
            bounds: default_bounds(),
        }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: default_ai_endpoint(),
            model: default_ai_model(),
            api_key: String::new(),
            api_key_env: default_ai_key_env(),
            timeout_secs: default_ai_timeout_secs(),
            connect_timeout_secs: default_ai_connect_timeout_secs(),
            max_tokens: default_ai_max_tokens(),
            temperature: default_ai_temperature(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3001
}

fn default_air_base_url() -> String {
    "https://api.waqi.info".to_string()
}

fn default_air_token_env() -> String {
    "WAQI_TOKEN".to_string()
}

fn default_bounds() -> BoundingBox {
    BoundingBox {
        south: 43.15,
        west: 76.75,
        north: 43.40,
        east: 77.10,
    }
}

fn default_ai_endpoint() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_ai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_ai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_ai_timeout_secs() -> u64 {
    20
}

fn default_ai_connect_timeout_secs() -> u64 {
    5
}

fn default_ai_max_tokens() -> u32 {
    400
}

fn default_ai_temperature() -> f32 {
    0.3
}

fn default_true() -> bool {
    true
}
