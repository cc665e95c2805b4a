use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";
const CONFIG_PATH_ENV: &str = "MATHEVAL_CONFIG";

/// 服务配置，启动时读取一次后通过 web::Data 注入各个 handler
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 为空时由 actix 按 CPU 核数决定
    pub workers: Option<usize>,
    pub max_payload_mb: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            workers: None,
            max_payload_mb: 16,
        }
    }
}

#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub ocr_model: String,
    pub eval_model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            ocr_model: "gpt-4o-mini".to_string(),
            eval_model: "gpt-4o-mini".to_string(),
            timeout_secs: 150,
            max_attempts: 3,
            retry_backoff_ms: 500,
        }
    }
}

// api_key 不能出现在日志里
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("ocr_model", &self.ocr_model)
            .field("eval_model", &self.eval_model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .finish()
    }
}

impl Config {
    /// 读取配置文件，再用环境变量覆盖，最后校验
    pub fn load() -> Result<Config, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = Config::from_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 配置文件不存在时使用默认值
    pub fn from_file(path: &str) -> Result<Config, ConfigError> {
        if !Path::new(path).exists() {
            log::info!("Config file {} not found, using defaults", path);
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.provider.api_key = key;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.provider.base_url = url;
        }
        if let Some(model) = lookup("OCR_MODEL") {
            self.provider.ocr_model = model;
        }
        if let Some(model) = lookup("EVAL_MODEL") {
            self.provider.eval_model = model;
        }
        if let Some(host) = lookup("HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PORT", port.clone()))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Url::parse(&self.provider.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: self.provider.base_url.clone(),
            source,
        })?;
        if self.provider.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("provider.max_attempts", "0".to_string()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("provider.timeout_secs", "0".to_string()));
        }
        if self.server.max_payload_mb == 0 {
            return Err(ConfigError::InvalidValue("server.max_payload_mb", "0".to_string()));
        }
        if self.server.workers == Some(0) {
            return Err(ConfigError::InvalidValue("server.workers", "0".to_string()));
        }
        Ok(())
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.server.max_payload_mb * 1024 * 1024
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}
