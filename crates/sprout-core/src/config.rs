use std::collections::HashMap;
use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, SproutError};

// Keys expected in the env file. All three are required.
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_API_KEY: &str = "YA_API_KEY";
pub const ENV_FOLDER_ID: &str = "YA_FOLDER_ID";

pub const DEFAULT_ENV_FILE: &str = ".env";
pub const DEFAULT_CONFIG_FILE: &str = "sprout.toml";
pub const DEFAULT_PROMPT_PATH: &str = "prompts/prompt.txt";

pub const DEFAULT_BASE_URL: &str = "https://llm.api.cloud.yandex.net/v1";
pub const DEFAULT_MODEL: &str = "yandexgpt-lite";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_MAX_TOKENS: u32 = 256;
/// Number of trailing history turns forwarded to the model on each call.
pub const DEFAULT_HISTORY_WINDOW: usize = 20;

/// Top-level config: secrets from the env file, tunables from
/// sprout.toml + SPROUT_* env overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SproutConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub greeting: GreetingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Filled from `TELEGRAM_BOT_TOKEN`; never read from TOML.
    #[serde(skip)]
    pub bot_token: String,
}

/// OpenAI-compatible completion endpoint (Yandex Foundation Models by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Short model name; the full URI is built by [`ProviderConfig::model_uri`].
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(skip)]
    pub api_key: String,
    #[serde(skip)]
    pub folder_id: String,
}

impl ProviderConfig {
    /// Model identifier in the form the endpoint expects: `gpt://{folder}/{model}`.
    ///
    /// A model that already carries a scheme is passed through untouched.
    pub fn model_uri(&self) -> String {
        if self.model.contains("://") {
            self.model.clone()
        } else {
            format!("gpt://{}/{}", self.folder_id, self.model)
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            api_key: String::new(),
            folder_id: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_prompt_path")]
    pub prompt_path: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Oldest turns are evicted once a session stores more than this.
    /// `None` keeps the whole history for the life of the process.
    #[serde(default)]
    pub max_stored_turns: Option<usize>,
    /// Instruction in the prompt file that tells the model to greet once.
    #[serde(default = "default_greeting_instruction")]
    pub greeting_instruction: String,
    /// Replacement for `greeting_instruction` once the chat has been greeted.
    #[serde(default = "default_followup_instruction")]
    pub followup_instruction: String,
    /// `/start` reply. `{name}` is replaced with the user's mention.
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// Frame for every user message sent to the model and kept in history.
    /// `{name}` is the sender's mention, `{text}` the message itself.
    #[serde(default = "default_user_message")]
    pub user_message: String,
    /// Prefix of the reply sent when the completion call fails.
    #[serde(default = "default_error_reply")]
    pub error_reply: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            prompt_path: default_prompt_path(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            history_window: default_history_window(),
            max_stored_turns: None,
            greeting_instruction: default_greeting_instruction(),
            followup_instruction: default_followup_instruction(),
            welcome: default_welcome(),
            user_message: default_user_message(),
            error_reply: default_error_reply(),
        }
    }
}

/// Lead-in phrases stripped from replies once the user has been greeted.
/// Order matters: the first matching phrase wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreetingConfig {
    #[serde(default = "default_phrases")]
    pub phrases: Vec<String>,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            phrases: default_phrases(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_prompt_path() -> String {
    DEFAULT_PROMPT_PATH.to_string()
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}
fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}
fn default_greeting_instruction() -> String {
    "Приветствуй клиента только один раз".to_string()
}
fn default_followup_instruction() -> String {
    "Не приветствуй повторно, просто продолжай разговор.".to_string()
}
fn default_welcome() -> String {
    "Привет, {name}! 👋 Я продавец-консультант садового центра. Чем могу помочь?".to_string()
}
fn default_user_message() -> String {
    "Пользователь: {name}, Вопрос: {text}".to_string()
}
fn default_error_reply() -> String {
    "Произошла ошибка при работе с моделью".to_string()
}
fn default_phrases() -> Vec<String> {
    [
        "Здравствуйте",
        "Привет",
        "Добрый день",
        "Добрый вечер",
        "Доброе утро",
        "Hello",
        "Good morning",
        "Good afternoon",
        "Good evening",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl SproutConfig {
    /// Load secrets from `env_path` and tunables from `config_path`.
    ///
    /// The env file and its three keys are mandatory. The TOML file is
    /// optional; every tunable has a default and may be overridden with
    /// `SPROUT_<SECTION>__<KEY>` environment variables.
    pub fn load(env_path: &Path, config_path: &Path) -> Result<Self> {
        let secrets = read_env_file(env_path)?;

        let mut config: SproutConfig = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SPROUT_").split("__"))
            .extract()
            .map_err(|e| SproutError::Config(e.to_string()))?;

        let path = env_path.display().to_string();
        config.telegram.bot_token = require(&secrets, ENV_TELEGRAM_BOT_TOKEN, &path)?;
        config.provider.api_key = require(&secrets, ENV_API_KEY, &path)?;
        config.provider.folder_id = require(&secrets, ENV_FOLDER_ID, &path)?;

        debug!(
            config = %config_path.display(),
            model = %config.provider.model,
            "configuration loaded"
        );
        Ok(config)
    }
}

/// Parse a dotenv-style file without touching the process environment.
fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let env_file_err = |reason: String| SproutError::EnvFile {
        path: path.display().to_string(),
        reason,
    };

    let iter = dotenvy::from_path_iter(path).map_err(|e| env_file_err(e.to_string()))?;
    let mut values = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| env_file_err(e.to_string()))?;
        values.insert(key, value);
    }
    Ok(values)
}

fn require(values: &HashMap<String, String>, key: &str, path: &str) -> Result<String> {
    match values.get(key) {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(SproutError::MissingKey {
            key: key.to_string(),
            path: path.to_string(),
        }),
    }
}
