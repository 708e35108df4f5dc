use std::time::Duration;

use tokio::sync::RwLock;
use tokio_util::task::TaskTracker;

use super::error::RegistryError;
use super::types::{Patch, Registration};

// 注册中心：保存所有活跃的注册信息，负责依赖下发和 Patch 扇出
#[derive(Debug)]
pub struct ServiceRegistry {
    registrations: RwLock<Vec<Registration>>,
    http_client: reqwest::Client,
    // 扇出推送任务
    task_tracker: TaskTracker,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl ServiceRegistry {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            http_client,
            task_tracker: TaskTracker::new(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, RegistryError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::new(http_client))
    }

    /// 添加服务，并把该服务所依赖的、已存在的服务直接下发给它
    ///
    /// 下发失败时返回错误，但注册本身不会回滚：实例仍会被心跳检测覆盖。
    pub async fn add(&self, registration: Registration) -> Result<(), RegistryError> {
        let replaced = {
            let mut registrations = self.registrations.write().await;
            match registrations
                .iter_mut()
                .find(|existing| existing.service_url == registration.service_url)
            {
                Some(existing) => {
                    *existing = registration.clone();
                    true
                }
                None => {
                    registrations.push(registration.clone());
                    false
                }
            }
        };

        tracing::info!(
            service_name = %registration.service_name,
            service_url = %registration.service_url,
            replaced,
            "Adding service"
        );

        // 通知需要该服务的其他 service
        self.fan_out(
            Patch::added(vec![registration.entry()]),
            Some(registration.service_url.as_str()),
        )
        .await;

        self.send_required_services(&registration).await
    }

    /// 按 URL 注销服务，并通知所有依赖它的服务
    pub async fn remove(&self, url: &str) -> Result<Registration, RegistryError> {
        let removed = {
            let mut registrations = self.registrations.write().await;
            registrations
                .iter()
                .position(|registration| registration.service_url == url)
                .map(|index| registrations.remove(index))
        };

        let Some(registration) = removed else {
            return Err(RegistryError::NotFound {
                url: url.to_string(),
            });
        };

        tracing::info!(
            service_name = %registration.service_name,
            service_url = %registration.service_url,
            "Removing service"
        );

        self.notify(Patch::removed(vec![registration.entry()])).await;
        Ok(registration)
    }

    /// 把 Patch 中与各注册者依赖相关的部分推送给它们，返回推送目标数
    pub async fn notify(&self, patch: Patch) -> usize {
        self.fan_out(patch, None).await
    }

    async fn fan_out(&self, patch: Patch, skip_url: Option<&str>) -> usize {
        let targets: Vec<(Patch, Registration)> = {
            let registrations = self.registrations.read().await;
            registrations
                .iter()
                .filter(|registration| Some(registration.service_url.as_str()) != skip_url)
                .map(|registration| (patch.filter_for(&registration.required_services), registration))
                .filter(|(sub_patch, _)| !sub_patch.is_empty())
                .map(|(sub_patch, registration)| (sub_patch, registration.clone()))
                .collect()
        };

        let count = targets.len();
        for (sub_patch, target) in targets {
            let http_client = self.http_client.clone();
            self.task_tracker.spawn(async move {
                if let Err(e) =
                    Self::send_patch(&http_client, &sub_patch, &target.service_update_url).await
                {
                    tracing::warn!(
                        service_name = %target.service_name,
                        update_url = %target.service_update_url,
                        error = %e,
                        "Failed to deliver patch, dropping it"
                    );
                }
            });
        }

        if count > 0 {
            tracing::debug!(targets = count, "Dispatched patch notifications");
        }
        count
    }

    // 查找当前服务需要的服务，并通过 update URL 下发给它；没有依赖时下发空 Patch
    async fn send_required_services(&self, registration: &Registration) -> Result<(), RegistryError> {
        let entries = {
            let registrations = self.registrations.read().await;
            registrations
                .iter()
                .filter(|existing| existing.service_url != registration.service_url)
                .filter(|existing| registration.requires(&existing.service_name))
                .map(Registration::entry)
                .collect()
        };
        let patch = Patch::added(entries);

        tracing::debug!(
            service_name = %registration.service_name,
            providers = patch.added.len(),
            "Sending required services to newcomer"
        );

        Self::send_patch(&self.http_client, &patch, &registration.service_update_url).await
    }

    async fn send_patch(
        http_client: &reqwest::Client,
        patch: &Patch,
        url: &str,
    ) -> Result<(), RegistryError> {
        let response = http_client.post(url).json(patch).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistryError::Rejected {
                url: url.to_string(),
                status,
            });
        }
        Ok(())
    }

    /// 当前所有活跃注册信息的快照
    pub async fn registrations(&self) -> Vec<Registration> {
        self.registrations.read().await.clone()
    }

    pub async fn contains(&self, url: &str) -> bool {
        self.registrations
            .read()
            .await
            .iter()
            .any(|registration| registration.service_url == url)
    }

    pub async fn len(&self) -> usize {
        self.registrations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 等待所有在途的推送结束
    pub async fn shutdown(&self) {
        self.task_tracker.close();
        self.task_tracker.wait().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, url: &str, required: &[&str]) -> Registration {
        Registration::new(
            name,
            url,
            required.iter().map(|name| name.to_string()).collect(),
        )
    }

    #[tokio::test]
    async fn test_add_keeps_one_entry_per_url() {
        let registry = ServiceRegistry::default();

        // 回调地址不可达，依赖下发失败，但注册本身保留
        for url in ["http://127.0.0.1:1", "http://127.0.0.1:2", "http://127.0.0.1:1"] {
            let result = registry.add(registration("LogService", url, &[])).await;
            assert!(matches!(result, Err(RegistryError::Transport(_))));
        }

        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_remove_then_add_restores_single_entry() {
        let registry = ServiceRegistry::default();
        let log = registration("LogService", "http://127.0.0.1:1", &[]);

        let _ = registry.add(log.clone()).await;
        let removed = registry.remove(&log.service_url).await.unwrap();
        assert_eq!(removed, log);
        assert!(registry.is_empty().await);

        let _ = registry.add(log.clone()).await;
        assert_eq!(registry.registrations().await, vec![log]);
    }

    #[tokio::test]
    async fn test_remove_unknown_url_is_not_found() {
        let registry = ServiceRegistry::default();

        let result = registry.remove("http://127.0.0.1:9").await;
        assert!(matches!(result, Err(RegistryError::NotFound { url }) if url == "http://127.0.0.1:9"));
    }

    #[tokio::test]
    async fn test_notify_targets_only_dependents() {
        let registry = ServiceRegistry::default();
        // 回调地址不可达，依赖下发失败，但注册本身保留
        let _ = registry
            .add(registration("C", "http://127.0.0.1:3", &["X"]))
            .await;
        let _ = registry
            .add(registration("D", "http://127.0.0.1:4", &["Y"]))
            .await;
        assert_eq!(registry.len().await, 2);

        let patch = Patch::added(vec![registration("X", "http://127.0.0.1:5", &[]).entry()]);
        assert_eq!(registry.notify(patch).await, 1);
        assert_eq!(registry.notify(Patch::default()).await, 0);
    }
}
