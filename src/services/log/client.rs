use std::io;

use http::header::CONTENT_TYPE;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing_subscriber::fmt::MakeWriter;

use super::server::LOG_PATH;

/// 把格式化后的日志行转发给日志服务
///
/// 每条日志进入无界队列，由后台任务逐条 POST 到 `<provider>/log`；
/// 转发失败的行直接丢弃，不会阻塞写日志的一方。
#[derive(Debug, Clone)]
pub struct RemoteLogWriter {
    prefix: String,
    lines: mpsc::UnboundedSender<String>,
}

impl RemoteLogWriter {
    pub fn spawn(
        provider_url: &str,
        service_name: &str,
        http_client: reqwest::Client,
    ) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let endpoint = format!("{}{LOG_PATH}", provider_url.trim_end_matches('/'));

        let handle = tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                let result = http_client
                    .post(&endpoint)
                    .header(CONTENT_TYPE, "text/plain")
                    .body(line)
                    .send()
                    .await;

                // 这里不能再走 tracing，否则会转发自己的错误
                match result {
                    Ok(response) if response.status().is_success() => {}
                    Ok(response) => {
                        eprintln!("Failed to send log message, service responded with {}", response.status());
                    }
                    Err(e) => eprintln!("Failed to send log message: {e}"),
                }
            }
        });

        let writer = Self {
            prefix: format!("[{service_name}] - "),
            lines: tx,
        };
        (writer, handle)
    }
}

impl<'a> MakeWriter<'a> for RemoteLogWriter {
    type Writer = RemoteLogLine;

    fn make_writer(&'a self) -> Self::Writer {
        RemoteLogLine {
            prefix: self.prefix.clone(),
            lines: self.lines.clone(),
            buf: Vec::new(),
        }
    }
}

/// 一次日志事件的缓冲，drop 时入队
#[derive(Debug)]
pub struct RemoteLogLine {
    prefix: String,
    lines: mpsc::UnboundedSender<String>,
    buf: Vec<u8>,
}

impl io::Write for RemoteLogLine {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for RemoteLogLine {
    fn drop(&mut self) {
        let line = String::from_utf8_lossy(&self.buf);
        let line = line.trim_end();
        if !line.is_empty() {
            let _ = self.lines.send(format!("{}{line}", self.prefix));
        }
    }
}
