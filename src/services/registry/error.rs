use http::StatusCode;

/// 注册中心错误类型
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Service at URL {url} not found")]
    NotFound { url: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Patch receiver {url} responded with status {status}")]
    Rejected { url: String, status: StatusCode },
}
