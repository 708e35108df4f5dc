use axum::Router;
use axum::extract::State;
use axum::routing::{any, post};
use bytes::Bytes;
use http::StatusCode;
use http::header::CONTENT_TYPE;
use url::Url;

use super::config::RegistryClientConfig;
use super::error::ClientError;
use super::provider::ProviderDirectory;
use crate::services::registry::{Patch, Registration};

/// 注册客户端：运行在每个依赖方服务内部
#[derive(Debug, Clone)]
pub struct RegistrationClient {
    config: RegistryClientConfig,
    http_client: reqwest::Client,
    providers: ProviderDirectory,
}

impl RegistrationClient {
    pub fn new(config: RegistryClientConfig) -> Result<Self, ClientError> {
        Self::with_providers(config, ProviderDirectory::default())
    }

    pub fn with_providers(
        config: RegistryClientConfig,
        providers: ProviderDirectory,
    ) -> Result<Self, ClientError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            http_client,
            providers,
        })
    }

    pub fn providers(&self) -> &ProviderDirectory {
        &self.providers
    }

    /// 根据服务名获取其对应的 url
    pub fn provider(&self, name: &str) -> Result<String, ClientError> {
        self.providers.resolve(name)
    }

    /// 心跳和更新两个回调路由，路径取自注册信息中的 URL
    pub fn callback_router(&self, registration: &Registration) -> Result<Router, ClientError> {
        let (heartbeat_path, update_path) = callback_paths(registration)?;

        Ok(Router::new()
            .route(&heartbeat_path, any(heartbeat))
            .route(&update_path, post(receive_patch))
            .with_state(self.providers.clone()))
    }

    /// 向注册中心提交注册信息
    ///
    /// 回调路由必须已经在监听（见 `callback_router`），注册中心会在本次请求中
    /// 回推依赖的服务。
    pub async fn register(&self, registration: &Registration) -> Result<(), ClientError> {
        callback_paths(registration)?;

        let response = self
            .http_client
            .post(&self.config.registry_url)
            .json(registration)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::RegistrationRejected { status });
        }

        tracing::info!(
            service_name = %registration.service_name,
            service_url = %registration.service_url,
            "Registered with registry"
        );
        Ok(())
    }

    /// 取消注册：DELETE 请求，纯文本 body 为服务 URL
    pub async fn deregister(&self, url: &str) -> Result<(), ClientError> {
        let response = self
            .http_client
            .delete(&self.config.registry_url)
            .header(CONTENT_TYPE, "text/plain")
            .body(url.to_string())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::DeregistrationRejected { status });
        }

        tracing::info!(service_url = %url, "Deregistered from registry");
        Ok(())
    }
}

fn callback_paths(registration: &Registration) -> Result<(String, String), ClientError> {
    let heartbeat_path = url_path(&registration.heartbeat_url)?;
    let update_path = url_path(&registration.service_update_url)?;
    if heartbeat_path == update_path {
        return Err(ClientError::ConflictingCallbacks {
            path: heartbeat_path,
        });
    }
    Ok((heartbeat_path, update_path))
}

fn url_path(url: &str) -> Result<String, ClientError> {
    let path = Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .map_err(|source| ClientError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;

    // axum 会把这类段当作旧式路径参数而拒绝路由
    if path
        .split('/')
        .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
    {
        return Err(ClientError::UnroutableCallback {
            url: url.to_string(),
        });
    }
    Ok(path)
}

// 存活即健康
async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

async fn receive_patch(State(providers): State<ProviderDirectory>, body: Bytes) -> StatusCode {
    let patch: Patch = match serde_json::from_slice(&body) {
        Ok(patch) => patch,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting malformed patch");
            return StatusCode::BAD_REQUEST;
        }
    };

    tracing::info!(added = ?patch.added, removed = ?patch.removed, "Update received");
    providers.apply(&patch);
    StatusCode::OK
}
