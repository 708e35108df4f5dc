use http::StatusCode;

/// 注册客户端错误类型
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Callback URL {url} has a path segment starting with ':' or '*'")]
    UnroutableCallback { url: String },
    #[error("Heartbeat and update callbacks share the path {path}")]
    ConflictingCallbacks { path: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to register service. Registry responded with code {status}")]
    RegistrationRejected { status: StatusCode },
    #[error("Failed to deregister service. Registry responded with code {status}")]
    DeregistrationRejected { status: StatusCode },
    #[error("No providers available for service {name}")]
    NoProviders { name: String },
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },
}
