use axum::Router;
use tokio_util::sync::CancellationToken;

use registry_hub::config::Config;
use registry_hub::server;
use registry_hub::services::client::{RegistrationClient, RegistryClientConfig};
use registry_hub::services::lifecycle::{self, ServiceHost};
use registry_hub::services::log::{self, FileLog};

#[global_allocator]
static GLOBAL: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    server::init_tracing();
    let config = Config::load()?;

    let service_url = config.log_service.service_url();
    let registration = log::registration(&service_url);
    let client = RegistrationClient::new(RegistryClientConfig::from(&config.client))?;

    // 本地运行，只需指定端口号
    let listener = lifecycle::bind(&format!("0.0.0.0:{}", config.log_service.port)).await?;
    let routes: Router = log::router(FileLog::new(&config.log_service.file));
    let host = ServiceHost::start(listener, registration, client, routes).await?;

    let signal = CancellationToken::new();
    let listener_failed = tokio::select! {
        _ = lifecycle::shutdown_signal(signal.clone()) => false,
        _ = host.stopped() => true,
    };

    if listener_failed {
        // 监听出错时 ServiceHost 已经取消注册
        tracing::warn!("Listener stopped unexpectedly");
    } else {
        host.shutdown().await?;
    }

    tracing::info!("Shutting down log service");
    Ok(())
}
