use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

/// 在多个服务提供方中选择一个
pub trait SelectionStrategy: Debug + Send + Sync {
    /// 返回被选中的下标；`candidates` 为空时返回 None
    fn choose(&self, candidates: &[String]) -> Option<usize>;
}

/// 均匀随机选择
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelection;

impl SelectionStrategy for RandomSelection {
    fn choose(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        Some(rand::thread_rng().gen_range(0..candidates.len()))
    }
}

/// 轮询选择
#[derive(Debug, Default)]
pub struct RoundRobinSelection {
    cursor: AtomicUsize,
}

impl SelectionStrategy for RoundRobinSelection {
    fn choose(&self, candidates: &[String]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(idx % candidates.len())
    }
}
