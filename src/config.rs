//! Configuration loading
//!
//! Defaults are embedded from `config.toml`. A user file, if present, is merged
//! over them table by table, so it only needs the keys it changes.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

const CONFIG_TOML: &str = include_str!("../config.toml");

/// Environment variable that overrides `recognition.api_key`
pub(crate) const API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    pub trigger: TriggerConfig,
    pub recognition: RecognitionConfig,
    pub video: VideoConfig,
    #[serde(default)]
    pub messages: Messages,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TriggerConfig {
    pub keyword: String,
}

#[derive(Clone, Deserialize)]
pub(crate) struct RecognitionConfig {
    pub language: String,
    pub continuous: bool,
    pub interim_results: bool,
    pub silence_timeout_secs: u64,
    pub endpoint: String,
    pub model: String,
    #[serde(default)]
    api_key: Option<String>,
}

// Hand-written so the key never ends up in logs.
impl std::fmt::Debug for RecognitionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionConfig")
            .field("language", &self.language)
            .field("continuous", &self.continuous)
            .field("interim_results", &self.interim_results)
            .field("silence_timeout_secs", &self.silence_timeout_secs)
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl RecognitionConfig {
    /// Language hint for the transcription service (`ja-JP` -> `ja`)
    pub fn service_language(&self) -> Option<String> {
        let primary = self.language.split(['-', '_']).next().unwrap_or_default();
        if primary.is_empty() {
            None
        } else {
            Some(primary.to_ascii_lowercase())
        }
    }

    /// Resolve the API key, preferring the environment over the config file
    pub fn api_key(&self) -> Option<Zeroizing<String>> {
        let from_env = std::env::var(API_KEY_ENV).ok();
        from_env
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.trim().is_empty())
            .map(Zeroizing::new)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct VideoConfig {
    pub path: PathBuf,
    pub player: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Status texts shown to the user
///
/// `{keyword}`, `{error}` and `{text}` placeholders are substituted when rendered.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub(crate) struct Messages {
    pub unsupported: String,
    pub listening: String,
    pub stopped: String,
    pub error: String,
    pub matched: String,
    pub recognized: String,
    pub input_received: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            unsupported: "お使いの環境は音声認識に対応していません。APIキーを設定してください。"
                .to_string(),
            listening: "音声認識を開始しました。「{keyword}」と話しかけてください。".to_string(),
            stopped: "音声認識が停止しました。".to_string(),
            error: "音声認識中にエラーが発生しました: {error}".to_string(),
            matched: "口約束ライブ9/28".to_string(),
            recognized: "認識された言葉: {text}".to_string(),
            input_received: "入力された言葉: {text}".to_string(),
        }
    }
}

impl Messages {
    pub fn listening(&self, keyword: &str) -> String {
        self.listening.replace("{keyword}", keyword)
    }

    pub fn error(&self, code: &str) -> String {
        self.error.replace("{error}", code)
    }

    pub fn recognized(&self, text: &str) -> String {
        self.recognized.replace("{text}", text)
    }

    pub fn input_received(&self, text: &str) -> String {
        self.input_received.replace("{text}", text)
    }
}

/// Default location of the user config file
pub(crate) fn default_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("keyword-trigger").join("config.toml"))
}

impl Config {
    /// Load the embedded defaults merged with an optional user file
    ///
    /// An explicit `path` must exist; the default user path is skipped when absent.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let user = match path {
            Some(path) => Some(read_file(path)?),
            None => match default_user_config_path() {
                Some(path) if path.exists() => Some(read_file(&path)?),
                _ => None,
            },
        };
        Self::from_sources(user.as_deref())
    }

    /// Build the config from the embedded defaults and an optional override document
    pub fn from_sources(user: Option<&str>) -> Result<Self, ConfigError> {
        let mut base: toml::Table = toml::from_str(CONFIG_TOML)?;
        if let Some(user) = user {
            let overlay: toml::Table = toml::from_str(user)?;
            merge_tables(&mut base, overlay);
        }

        let config: Config = toml::Value::Table(base).try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.trigger.keyword.is_empty() {
            return Err(ConfigError::Invalid {
                field: "trigger.keyword",
                message: "must not be empty".to_string(),
            });
        }
        if self.recognition.silence_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "recognition.silence_timeout_secs",
                message: "must be greater than zero".to_string(),
            });
        }
        let endpoint =
            url::Url::parse(&self.recognition.endpoint).map_err(|e| ConfigError::Invalid {
                field: "recognition.endpoint",
                message: e.to_string(),
            })?;
        if !matches!(endpoint.scheme(), "ws" | "wss") || endpoint.host_str().is_none() {
            return Err(ConfigError::Invalid {
                field: "recognition.endpoint",
                message: format!("expected a ws:// or wss:// URL, got {}", endpoint),
            });
        }
        if self.video.player.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "video.player",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    info!("Loading configuration from {:?}", path);
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Recursively merge `overlay` into `base`; non-table values replace
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                debug!("Config override: {}", key);
                base.insert(key, value);
            }
        }
    }
}
