//! Log forwarding: the `/log` endpoint backed by an append-only file, and a
//! `tracing` writer that ships formatted lines to it.

pub mod client;
pub mod server;

pub use client::RemoteLogWriter;
pub use server::{FileLog, LOG_PATH, router};

use crate::services::registry::{LOG_SERVICE, Registration};

/// 日志服务的注册信息，没有依赖
pub fn registration(service_url: &str) -> Registration {
    Registration::new(LOG_SERVICE, service_url, Vec::new())
}
