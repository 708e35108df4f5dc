use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tokio_util::task::TaskTracker;

use super::client::{ClientError, RegistrationClient};
use super::registry::Registration;

/// 绑定监听地址，失败属于启动错误
pub async fn bind(addr: &str) -> Result<TcpListener, ClientError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| ClientError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// 等待 Ctrl+C 或取消信号，之后触发取消
pub async fn shutdown_signal(cancel: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        }
        _ = cancel.cancelled() => {}
    }
    cancel.cancel();
}

/// 一个已注册到注册中心的服务实例
#[derive(Debug)]
pub struct ServiceHost {
    registration: Registration,
    client: RegistrationClient,
    local_addr: SocketAddr,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl ServiceHost {
    /// 在监听器上提供服务自身的路由和回调路由，然后注册
    ///
    /// 注册失败时会停止监听并返回错误，不会留下半注册状态。
    pub async fn start(
        listener: TcpListener,
        registration: Registration,
        client: RegistrationClient,
        routes: Router,
    ) -> Result<Self, ClientError> {
        let app = routes.merge(client.callback_router(&registration)?);
        let local_addr = listener.local_addr().map_err(|source| ClientError::Bind {
            addr: registration.service_url.clone(),
            source,
        })?;

        let cancel = CancellationToken::new();
        let tasks = TaskTracker::new();

        let serve_cancel = cancel.clone();
        let serve_client = client.clone();
        let service_url = registration.service_url.clone();
        let service_name = registration.service_name.clone();
        tasks.spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(serve_cancel.clone().cancelled_owned())
                .await;

            if let Err(e) = result {
                // 监听出错时注册请求可能已经发出，需要取消注册
                tracing::error!(service_name = %service_name, error = %e, "Listener failed");
                if let Err(e) = serve_client.deregister(&service_url).await {
                    tracing::warn!(error = %e, "Failed to deregister after listener failure");
                }
            }
            serve_cancel.cancel();
        });

        tracing::info!(
            service_name = %registration.service_name,
            local_addr = %local_addr,
            "Service listening"
        );

        if let Err(e) = client.register(&registration).await {
            cancel.cancel();
            tasks.close();
            tasks.wait().await;
            return Err(e);
        }

        Ok(Self {
            registration,
            client,
            local_addr,
            cancel,
            tasks,
        })
    }

    pub fn registration(&self) -> &Registration {
        &self.registration
    }

    pub fn client(&self) -> &RegistrationClient {
        &self.client
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 监听结束（主动关闭或出错）时完成
    pub fn stopped(&self) -> WaitForCancellationFuture<'_> {
        self.cancel.cancelled()
    }

    /// 取消注册并停止监听
    pub async fn shutdown(self) -> Result<(), ClientError> {
        let result = self.client.deregister(&self.registration.service_url).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Failed to deregister during shutdown");
        }

        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;

        tracing::info!(service_name = %self.registration.service_name, "Service stopped");
        result
    }
}
