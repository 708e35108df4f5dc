use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::services::heartbeat::{HeartbeatConfig, HeartbeatMonitor};
use crate::services::lifecycle::shutdown_signal;
use crate::services::registry::{self, ServiceRegistry};

/// 安装 fmt 订阅者，过滤级别取自 RUST_LOG，默认 info
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = config.registry.socket_addr()?;

    let http_client = reqwest::Client::builder()
        .timeout(config.registry.request_timeout())
        .build()?;

    // 初始化服务注册表
    let registry = Arc::new(ServiceRegistry::new(http_client.clone()));

    let cancel = CancellationToken::new();
    let tasks = TaskTracker::new();

    // 启动心跳检测
    let monitor = HeartbeatMonitor::new(
        registry.clone(),
        http_client,
        HeartbeatConfig::from(&config.registry),
    );
    tasks.spawn(monitor.run(cancel.clone()));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Registry server listening");

    let result = axum::serve(listener, registry::router(registry.clone()))
        .with_graceful_shutdown(shutdown_signal(cancel.clone()))
        .await;

    cancel.cancel();
    tasks.close();
    tasks.wait().await;
    registry.shutdown().await;

    tracing::info!("Shutting down registry service");
    result?;
    Ok(())
}
