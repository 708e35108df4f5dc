use serde::{Deserialize, Serialize};

/// 逻辑服务名，同一服务的多个实例共享同一个名字
pub type ServiceName = String;

// 目前存在的服务类型
pub const LOG_SERVICE: &str = "LogService";
pub const PORTAL_SERVICE: &str = "PortalService";

// 服务注册信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(rename = "ServiceName")]
    pub service_name: ServiceName,
    /// 实例的基础地址，在注册表中作为唯一键
    #[serde(rename = "ServiceURL")]
    pub service_url: String,
    // 该服务所依赖的服务
    #[serde(rename = "RequiredServices", default, deserialize_with = "null_as_empty")]
    pub required_services: Vec<ServiceName>,
    /// 注册中心推送 Patch 的地址
    #[serde(rename = "ServiceUpdateURL")]
    pub service_update_url: String,
    /// 心跳检测地址
    #[serde(rename = "HeartbeatURL")]
    pub heartbeat_url: String,
}

impl Registration {
    /// 以约定的回调路径构建注册信息：`/services` 接收更新，`/heartbeat` 用于探活
    pub fn new(
        service_name: impl Into<ServiceName>,
        service_url: impl Into<String>,
        required_services: Vec<ServiceName>,
    ) -> Self {
        let service_url = service_url.into().trim_end_matches('/').to_string();
        Self {
            service_name: service_name.into(),
            service_update_url: format!("{service_url}/services"),
            heartbeat_url: format!("{service_url}/heartbeat"),
            service_url,
            required_services,
        }
    }

    pub fn requires(&self, name: &str) -> bool {
        self.required_services.iter().any(|required| required == name)
    }

    pub fn entry(&self) -> PatchEntry {
        PatchEntry {
            name: self.service_name.clone(),
            url: self.service_url.clone(),
        }
    }
}

// 一条 服务名 -> 地址 的绑定
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PatchEntry {
    #[serde(rename = "Name")]
    pub name: ServiceName,
    #[serde(rename = "URL")]
    pub url: String,
}

impl PatchEntry {
    pub fn new(name: impl Into<ServiceName>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// 增量变更：每次增加和删除的服务，从不表示完整快照
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    #[serde(rename = "Added", default, deserialize_with = "null_as_empty")]
    pub added: Vec<PatchEntry>,
    #[serde(rename = "Removed", default, deserialize_with = "null_as_empty")]
    pub removed: Vec<PatchEntry>,
}

impl Patch {
    pub fn added(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: entries,
            removed: Vec::new(),
        }
    }

    pub fn removed(entries: Vec<PatchEntry>) -> Self {
        Self {
            added: Vec::new(),
            removed: entries,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// 只保留与给定依赖名匹配的条目
    pub fn filter_for(&self, required: &[ServiceName]) -> Patch {
        let wanted = |entry: &&PatchEntry| required.iter().any(|name| *name == entry.name);
        Patch {
            added: self.added.iter().filter(wanted).cloned().collect(),
            removed: self.removed.iter().filter(wanted).cloned().collect(),
        }
    }
}

// 兼容对端把空列表编码成 null
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
