use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

/// Backend used when nothing else is configured
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Client-side deadline applied to every backend call
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hello! I'm your documentation assistant. How can I help you today?";

const BACKEND_URL_VAR: &str = "DOCCHAT_BACKEND_URL";
const ENABLE_TRANSLATION_VAR: &str = "DOCCHAT_ENABLE_TRANSLATION";

/// On-disk settings. Every field is optional so a partial file still loads.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FileConfig {
    pub backend_url: Option<String>,
    pub enable_translation: Option<bool>,
    pub welcome_message: Option<String>,
}

impl FileConfig {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let config_content = fs::read_to_string(path)?;
        let config: FileConfig = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("docchat").join("config.json"))
    }
}

impl From<&Config> for FileConfig {
    fn from(config: &Config) -> Self {
        Self {
            backend_url: Some(config.backend_url.clone()),
            enable_translation: Some(config.enable_translation),
            welcome_message: Some(config.welcome_message.clone()),
        }
    }
}

/// Resolved, immutable settings handed to the client and widget at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub backend_url: String,
    pub timeout: Duration,
    pub enable_translation: bool,
    pub welcome_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            enable_translation: false,
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
        }
    }
}

impl Config {
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_translation(mut self, enabled: bool) -> Self {
        self.enable_translation = enabled;
        self
    }

    /// Resolve from the process environment and the user's config file.
    pub fn from_env() -> Result<Self> {
        let file = FileConfig::load()?;
        Ok(Self::resolve(
            &file,
            std::env::var(BACKEND_URL_VAR).ok(),
            std::env::var(ENABLE_TRANSLATION_VAR).ok(),
        ))
    }

    /// Environment values win over the file; blanks count as unset.
    pub fn resolve(file: &FileConfig, env_url: Option<String>, env_translation: Option<String>) -> Self {
        let backend_url = env_url
            .filter(|url| !url.trim().is_empty())
            .or_else(|| file.backend_url.clone().filter(|url| !url.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let enable_translation = match env_translation {
            Some(value) => value == "true",
            None => file.enable_translation.unwrap_or(false),
        };

        let welcome_message = file
            .welcome_message
            .clone()
            .filter(|msg| !msg.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string());

        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            timeout: DEFAULT_TIMEOUT,
            enable_translation,
            welcome_message,
        }
    }

    /// Join a backend path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url, path)
    }
}
