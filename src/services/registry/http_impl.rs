use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use bytes::Bytes;
use http::StatusCode;

use super::service::ServiceRegistry;
use super::types::Registration;

/// 注册中心对外暴露的路径
pub const SERVICES_PATH: &str = "/services";

// POST 注册，DELETE 取消注册，其余方法由 axum 返回 405
pub fn router(registry: Arc<ServiceRegistry>) -> Router {
    Router::new()
        .route(SERVICES_PATH, post(register).delete(deregister))
        .with_state(registry)
}

async fn register(State(registry): State<Arc<ServiceRegistry>>, body: Bytes) -> StatusCode {
    let registration: Registration = match serde_json::from_slice(&body) {
        Ok(registration) => registration,
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting malformed registration");
            return StatusCode::BAD_REQUEST;
        }
    };

    match registry.add(registration).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Registration completed with errors");
            StatusCode::BAD_REQUEST
        }
    }
}

async fn deregister(State(registry): State<Arc<ServiceRegistry>>, body: Bytes) -> StatusCode {
    let url = match std::str::from_utf8(&body) {
        Ok(url) => url.trim(),
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting non UTF-8 deregistration body");
            return StatusCode::BAD_REQUEST;
        }
    };

    tracing::info!(service_url = %url, "Deregistration requested");
    match registry.remove(url).await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Deregistration failed");
            StatusCode::BAD_REQUEST
        }
    }
}
