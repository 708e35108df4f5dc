use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::ClientError;
use super::selection::{RandomSelection, SelectionStrategy};
use crate::services::registry::{Patch, ServiceName};

/// 服务提供方目录：只通过收到的 Patch 维护，每个服务可能有多个 url
#[derive(Debug, Clone)]
pub struct ProviderDirectory {
    services: Arc<Mutex<HashMap<ServiceName, Vec<String>>>>,
    strategy: Arc<dyn SelectionStrategy>,
}

impl Default for ProviderDirectory {
    fn default() -> Self {
        Self::new(Arc::new(RandomSelection))
    }
}

impl ProviderDirectory {
    pub fn new(strategy: Arc<dyn SelectionStrategy>) -> Self {
        Self {
            services: Arc::new(Mutex::new(HashMap::new())),
            strategy,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ServiceName, Vec<String>>> {
        // 持锁期间不会 panic，中毒时直接沿用内部数据
        self.services.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 应用增量变更；重复的新增和不存在的删除都会被忽略
    pub fn apply(&self, patch: &Patch) {
        let mut services = self.lock();

        for entry in &patch.added {
            let urls = services.entry(entry.name.clone()).or_default();
            if !urls.contains(&entry.url) {
                urls.push(entry.url.clone());
            }
        }

        for entry in &patch.removed {
            if let Some(urls) = services.get_mut(&entry.name) {
                urls.retain(|url| *url != entry.url);
                if urls.is_empty() {
                    services.remove(&entry.name);
                }
            }
        }
    }

    /// 按选择策略返回一个提供方地址
    pub fn resolve(&self, name: &str) -> Result<String, ClientError> {
        let services = self.lock();
        services
            .get(name)
            .and_then(|urls| {
                self.strategy
                    .choose(urls)
                    .and_then(|idx| urls.get(idx).cloned())
            })
            .ok_or_else(|| ClientError::NoProviders {
                name: name.to_string(),
            })
    }

    pub fn providers(&self, name: &str) -> Vec<String> {
        self.lock().get(name).cloned().unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
