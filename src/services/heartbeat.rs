use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use http::StatusCode;
use tokio_util::sync::CancellationToken;

use super::registry::{Registration, RegistryError, ServiceRegistry};
use crate::config::RegistryConfig;

/// 心跳检测配置
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// 两轮检测之间的间隔
    pub interval: Duration,
    /// 每轮对单个实例的最大探测次数
    pub probe_attempts: u32,
    /// 两次探测之间的间隔
    pub probe_interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            probe_attempts: 3,
            probe_interval: Duration::from_secs(1),
        }
    }
}

impl From<&RegistryConfig> for HeartbeatConfig {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            interval: config.heartbeat_interval(),
            probe_attempts: config.probe_attempts,
            probe_interval: config.probe_interval(),
        }
    }
}

/// 单个实例一轮检测的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    /// 本轮先失败后恢复，已重新注册
    Recovered,
    /// 连续探测全部失败，已从注册表移除
    Removed,
    /// 检测期间实例已被其他途径注销，不再处理
    Departed,
}

// 心跳检测：周期性探测所有注册实例，驱动移除和恢复
#[derive(Debug, Clone)]
pub struct HeartbeatMonitor {
    registry: Arc<ServiceRegistry>,
    http_client: reqwest::Client,
    config: HeartbeatConfig,
}

impl HeartbeatMonitor {
    pub fn new(
        registry: Arc<ServiceRegistry>,
        http_client: reqwest::Client,
        mut config: HeartbeatConfig,
    ) -> Self {
        // 每轮至少探测一次
        config.probe_attempts = config.probe_attempts.max(1);
        Self {
            registry,
            http_client,
            config,
        }
    }

    /// 循环执行检测，直到取消
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(
            interval_ms = self.config.interval.as_millis() as u64,
            probe_attempts = self.config.probe_attempts,
            "Heartbeat monitor started"
        );

        // 进行中的一轮不会被中断，只在轮次之间响应取消
        while !cancel.is_cancelled() {
            self.check_round().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }
        }

        tracing::info!("Heartbeat monitor stopped");
    }

    /// 并发检测当前所有实例，全部结束后返回
    pub async fn check_round(&self) -> Vec<(String, ProbeOutcome)> {
        let registrations = self.registry.registrations().await;
        tracing::debug!(registrations = registrations.len(), "Executing heartbeat round...");

        join_all(registrations.into_iter().map(|registration| async move {
            let outcome = self.check_registration(&registration).await;
            (registration.service_url, outcome)
        }))
        .await
    }

    async fn check_registration(&self, registration: &Registration) -> ProbeOutcome {
        let mut healthy = true;

        for attempt in 1..=self.config.probe_attempts {
            if self.probe(registration).await {
                tracing::debug!(
                    service_name = %registration.service_name,
                    "Heartbeat check passed"
                );
                if healthy {
                    return ProbeOutcome::Healthy;
                }

                tracing::info!(
                    service_name = %registration.service_name,
                    service_url = %registration.service_url,
                    attempt,
                    "Service recovered, registering it again"
                );
                if let Err(e) = self.registry.add(registration.clone()).await {
                    tracing::warn!(
                        service_name = %registration.service_name,
                        error = %e,
                        "Re-registration after recovery completed with errors"
                    );
                }
                return ProbeOutcome::Recovered;
            }

            tracing::warn!(
                service_name = %registration.service_name,
                attempt,
                max_attempts = self.config.probe_attempts,
                "Heartbeat check failed"
            );

            // 第一次失败即移除，不等待剩余的重试
            if healthy {
                healthy = false;
                match self.registry.remove(&registration.service_url).await {
                    Ok(_) => {}
                    Err(RegistryError::NotFound { .. }) => return ProbeOutcome::Departed,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to remove unhealthy service");
                    }
                }
            }

            if attempt < self.config.probe_attempts {
                tokio::time::sleep(self.config.probe_interval).await;
            }
        }

        ProbeOutcome::Removed
    }

    async fn probe(&self, registration: &Registration) -> bool {
        match self.http_client.get(&registration.heartbeat_url).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                tracing::warn!(
                    heartbeat_url = %registration.heartbeat_url,
                    error = %e,
                    "Heartbeat probe transport error"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_registry_section() {
        let registry_config = RegistryConfig {
            heartbeat_interval_secs: 7,
            probe_attempts: 5,
            probe_interval_secs: 2,
            ..Default::default()
        };

        let config = HeartbeatConfig::from(&registry_config);
        assert_eq!(config.interval, Duration::from_secs(7));
        assert_eq!(config.probe_attempts, 5);
        assert_eq!(config.probe_interval, Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_unreachable_instance_is_removed() {
        let registry = Arc::new(ServiceRegistry::default());
        // 依赖下发同样不可达，注册仍然保留
        let _ = registry
            .add(Registration::new("LogService", "http://127.0.0.1:1", Vec::new()))
            .await;
        assert!(registry.contains("http://127.0.0.1:1").await);

        let monitor = HeartbeatMonitor::new(registry.clone(), reqwest::Client::new(), HeartbeatConfig {
            interval: Duration::from_millis(10),
            probe_attempts: 2,
            probe_interval: Duration::from_millis(10),
        });

        let outcomes = monitor.check_round().await;
        assert_eq!(outcomes, vec![("http://127.0.0.1:1".to_string(), ProbeOutcome::Removed)]);
        assert!(registry.is_empty().await);

        // 已移除的实例不再参与下一轮
        assert!(monitor.check_round().await.is_empty());
    }

    #[tokio::test]
    async fn test_zero_attempts_still_probes_once() {
        let registry = Arc::new(ServiceRegistry::default());
        let _ = registry
            .add(Registration::new("LogService", "http://127.0.0.1:1", Vec::new()))
            .await;

        let monitor = HeartbeatMonitor::new(registry.clone(), reqwest::Client::new(), HeartbeatConfig {
            interval: Duration::from_millis(10),
            probe_attempts: 0,
            probe_interval: Duration::from_millis(10),
        });

        let outcomes = monitor.check_round().await;
        assert_eq!(outcomes, vec![("http://127.0.0.1:1".to_string(), ProbeOutcome::Removed)]);
        assert!(registry.is_empty().await);
    }
}
