#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::routing::{any, post};
use bytes::Bytes;
use http::StatusCode;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use registry_hub::services::client::RegistryClientConfig;
use registry_hub::services::heartbeat::{HeartbeatConfig, HeartbeatMonitor};
use registry_hub::services::registry::{self, Patch, Registration, ServiceRegistry};

pub const WAIT: Duration = Duration::from_secs(5);

async fn serve(router: Router) -> (String, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone().cancelled_owned();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await;
    });
    (format!("http://{addr}"), cancel)
}

/// 运行在本地随机端口上的注册中心
pub struct TestRegistry {
    pub registry: Arc<ServiceRegistry>,
    pub services_url: String,
    cancel: CancellationToken,
}

impl Drop for TestRegistry {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl TestRegistry {
    pub async fn spawn() -> Self {
        let registry = Arc::new(ServiceRegistry::with_timeout(Duration::from_secs(2)).unwrap());
        let (base_url, cancel) = serve(registry::router(registry.clone())).await;
        Self {
            registry,
            services_url: format!("{base_url}{}", registry::SERVICES_PATH),
            cancel,
        }
    }

    pub fn client_config(&self) -> RegistryClientConfig {
        RegistryClientConfig {
            registry_url: self.services_url.clone(),
            request_timeout: Duration::from_secs(2),
        }
    }

    pub fn monitor(&self, probe_attempts: u32, probe_interval: Duration) -> HeartbeatMonitor {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .unwrap();
        HeartbeatMonitor::new(self.registry.clone(), http_client, HeartbeatConfig {
            interval: Duration::from_millis(50),
            probe_attempts,
            probe_interval,
        })
    }

    pub async fn register(&self, registration: &Registration) -> StatusCode {
        reqwest::Client::new()
            .post(&self.services_url)
            .json(registration)
            .send()
            .await
            .unwrap()
            .status()
    }

    pub async fn deregister(&self, url: &str) -> StatusCode {
        reqwest::Client::new()
            .delete(&self.services_url)
            .body(url.to_string())
            .send()
            .await
            .unwrap()
            .status()
    }
}

#[derive(Clone)]
struct InstanceState {
    patches: mpsc::UnboundedSender<Patch>,
    heartbeat_hits: Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
}

/// 记录收到的 Patch、心跳可控的假服务实例
pub struct FakeInstance {
    pub registration: Registration,
    pub heartbeat_hits: Arc<AtomicUsize>,
    patches: mpsc::UnboundedReceiver<Patch>,
    failures: Arc<AtomicUsize>,
    cancel: CancellationToken,
}

impl Drop for FakeInstance {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl FakeInstance {
    pub async fn spawn(name: &str, required: &[&str]) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = InstanceState {
            patches: tx,
            heartbeat_hits: Arc::new(AtomicUsize::new(0)),
            failures: Arc::new(AtomicUsize::new(0)),
        };

        let router = Router::new()
            .route("/heartbeat", any(heartbeat))
            .route("/services", post(receive_patch))
            .with_state(state.clone());
        let (base_url, cancel) = serve(router).await;

        Self {
            registration: Registration::new(
                name,
                base_url,
                required.iter().map(|name| name.to_string()).collect(),
            ),
            heartbeat_hits: state.heartbeat_hits,
            patches: rx,
            failures: state.failures,
            cancel,
        }
    }

    pub fn url(&self) -> &str {
        &self.registration.service_url
    }

    /// 接下来的 n 次心跳返回 500；usize::MAX 表示一直失败
    pub fn fail_heartbeats(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub async fn next_patch(&mut self) -> Patch {
        timeout(WAIT, self.patches.recv())
            .await
            .expect("Timeout waiting for patch")
            .expect("Patch channel closed")
    }

    pub async fn assert_no_patch(&mut self, wait: Duration) {
        if let Ok(Some(patch)) = timeout(wait, self.patches.recv()).await {
            panic!("Unexpected patch: {patch:?}");
        }
    }
}

async fn heartbeat(State(state): State<InstanceState>) -> StatusCode {
    state.heartbeat_hits.fetch_add(1, Ordering::SeqCst);
    let failing = state
        .failures
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| match n {
            0 => None,
            usize::MAX => Some(n),
            n => Some(n - 1),
        })
        .is_ok();

    if failing {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn receive_patch(State(state): State<InstanceState>, body: Bytes) -> StatusCode {
    match serde_json::from_slice::<Patch>(&body) {
        Ok(patch) => {
            let _ = state.patches.send(patch);
            StatusCode::OK
        }
        Err(_) => StatusCode::BAD_REQUEST,
    }
}

/// 轮询直到条件成立
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Condition not reached in time");
}
