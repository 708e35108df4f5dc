use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::Router;
use axum::extract::State;
use axum::routing::post;
use bytes::Bytes;
use http::StatusCode;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

pub const LOG_PATH: &str = "/log";
const LINE_PREFIX: &str = "[registry_hub] - ";

/// 追加写入的日志文件，每次写入都重新打开
#[derive(Debug, Clone)]
pub struct FileLog {
    path: PathBuf,
}

impl FileLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, message: &str) -> io::Result<()> {
        let mut options = OpenOptions::new();
        options.create(true).append(true);
        #[cfg(unix)]
        options.mode(0o600);

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let mut file = options.open(&self.path).await?;
        file.write_all(format!("{LINE_PREFIX}{timestamp} {}\n", message.trim_end()).as_bytes())
            .await?;
        file.flush().await
    }
}

// 接收 post 请求，将其内容写入日志文件
pub fn router(log: FileLog) -> Router {
    Router::new()
        .route(LOG_PATH, post(write_log))
        .with_state(log)
}

async fn write_log(State(log): State<FileLog>, body: Bytes) -> StatusCode {
    if body.is_empty() {
        return StatusCode::BAD_REQUEST;
    }

    let message = String::from_utf8_lossy(&body);
    match log.write(&message).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!(path = %log.path().display(), error = %e, "Failed to append log line");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
