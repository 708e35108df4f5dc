use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "REGISTRY_";

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] io::Error),
    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid environment override: {0}")]
    Env(#[from] envy::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub client: ClientConfig,
    pub log_service: LogServiceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub bind_addr: String,
    pub heartbeat_interval_secs: u64,
    pub probe_attempts: u32,
    pub probe_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            heartbeat_interval_secs: 3,
            probe_attempts: 3,
            probe_interval_secs: 1,
            request_timeout_secs: 10,
        }
    }
}

impl RegistryConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("bind_addr {}: {e}", self.bind_addr)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub registry_url: String,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:3000/services".to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogServiceConfig {
    pub host: String,
    pub port: u16,
    pub file: PathBuf,
}

impl Default for LogServiceConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 4000,
            file: PathBuf::from("./distribute.log"),
        }
    }
}

impl LogServiceConfig {
    pub fn service_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

// REGISTRY_ 前缀的环境变量覆盖
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    bind_addr: Option<String>,
    heartbeat_interval_secs: Option<u64>,
    url: Option<String>,
    log_host: Option<String>,
    log_port: Option<u16>,
    log_file: Option<PathBuf>,
}

impl Config {
    /// 依次加载 .env、config.toml（可选）和环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let mut config = Self::load_file(CONFIG_FILE)?;
        let overrides = envy::prefixed(ENV_PREFIX).from_env::<EnvOverrides>()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    // 文件不存在时使用默认配置
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(config_str) => Self::from_toml_str(&config_str),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml_str(config_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(config_str)?)
    }

    fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(bind_addr) = overrides.bind_addr {
            self.registry.bind_addr = bind_addr;
        }
        if let Some(secs) = overrides.heartbeat_interval_secs {
            self.registry.heartbeat_interval_secs = secs;
        }
        if let Some(url) = overrides.url {
            self.client.registry_url = url;
        }
        if let Some(host) = overrides.log_host {
            self.log_service.host = host;
        }
        if let Some(port) = overrides.log_port {
            self.log_service.port = port;
        }
        if let Some(file) = overrides.log_file {
            self.log_service.file = file;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.heartbeat_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.registry.probe_attempts == 0 {
            return Err(ConfigError::Invalid(
                "probe_attempts must be greater than zero".to_string(),
            ));
        }
        if self.registry.request_timeout_secs == 0 || self.client.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        self.registry.socket_addr()?;
        Ok(())
    }
}
