use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are Xiao Wang, a professional AI assistant for a \
power-station data management system.
Your responsibilities are:
1. Help users query and understand power-station data (the system holds 5000+ power-station records worldwide)
2. Answer questions about system features (data display, create/read/update/delete, theme switching, etc.)
3. Give professional, friendly and accurate answers
4. Explain complex concepts in concise, clear language

Keep a professional and friendly tone.";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub qa: QaConfig,
    pub cors: Option<CorsConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "get_default_db_path")]
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

/// Generation service settings
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub top_p: f32,
    pub timeout_secs: u64,
}

/// Conversation behaviour
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QaConfig {
    pub system_prompt: String,
    /// Prior messages sent with each question, counted in messages not tokens
    pub history_limit: usize,
    /// Session used by HTTP callers that do not name one
    pub default_session_id: String,
    /// Run turns of the same session one at a time
    pub serialize_turns: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files; stdout only when unset
    pub directory: Option<PathBuf>,
}

fn default_pool_size() -> u32 {
    4
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8899,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: get_default_db_path(),
            pool_size: default_pool_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: station_llm_sdk::providers::OLLAMA_DEFAULT_BASE_URL.to_string(),
            model: "deepseek-r1:32b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            timeout_secs: 60,
        }
    }
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            history_limit: 10,
            default_session_id: "default".to_string(),
            serialize_turns: true,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
            qa: QaConfig::default(),
            cors: Some(CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            }),
            logging: None,
        }
    }
}

impl ApiConfig {
    /// Load the config from the default location, creating it on first run.
    pub fn load() -> Result<(Self, PathBuf), ConfigError> {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<(Self, PathBuf), ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        // Create default config file if it doesn't exist
        if !config_path.exists() {
            let default_config = toml::to_string_pretty(&ApiConfig::default()).map_err(|e| {
                ConfigError::Message(format!("Failed to render default config: {e}"))
            })?;
            std::fs::write(config_path, default_config).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.to_path_buf()))
            .add_source(config::Environment::with_prefix("STATION_QA").separator("__"))
            .build()?;

        let mut config: ApiConfig = builder.try_deserialize()?;

        // Expand tilde in database path
        config.database.path = expand_tilde(&config.database.path);
        if let Some(logging) = config.logging.as_mut() {
            logging.directory = logging.directory.as_deref().map(expand_tilde);
        }

        Ok((config, config_path.to_path_buf()))
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = home::home_dir() {
            let path_str = path.to_string_lossy();
            let expanded = path_str.replacen('~', &home.to_string_lossy(), 1);
            return PathBuf::from(expanded);
        }
    }
    path.to_path_buf()
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("station-qa/api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

fn get_default_db_path() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join("station-qa/qa.db")
    } else {
        PathBuf::from("qa.db")
    }
}
