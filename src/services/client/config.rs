use std::time::Duration;

use crate::config::ClientConfig;

/// 注册客户端配置
#[derive(Debug, Clone)]
pub struct RegistryClientConfig {
    /// 注册中心的 /services 地址
    pub registry_url: String,
    /// 请求超时时间
    pub request_timeout: Duration,
}

impl Default for RegistryClientConfig {
    fn default() -> Self {
        Self {
            registry_url: "http://localhost:3000/services".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ClientConfig> for RegistryClientConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            registry_url: config.registry_url.clone(),
            request_timeout: config.request_timeout(),
        }
    }
}
