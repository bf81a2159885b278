use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tokio::sync::Notify;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Success,
    Info,
    Error,
}

/// Transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: ToastLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            ToastLevel::Success => "ok",
            ToastLevel::Info => "info",
            ToastLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ToastError {
    #[error("toast surface unavailable")]
    Unavailable,
}

/// Where toasts are shown.
pub trait Toaster: Send + Sync {
    fn show(&self, toast: Toast) -> Result<(), ToastError>;
}

/// Show a toast, logging instead of failing.
pub fn show(toaster: &dyn Toaster, toast: Toast) {
    if let Err(err) = toaster.show(toast) {
        tracing::warn!(%err, "toast display failed");
    }
}

/// Bounded in-memory toast queue; the oldest toast is dropped when full.
pub struct ToastQueue {
    capacity: usize,
    queue: Mutex<VecDeque<Toast>>,
    notify: Notify,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
        }
    }

    pub fn drain(&self) -> Vec<Toast> {
        self.queue.lock().drain(..).collect()
    }

    /// Wait for at least one toast, then drain.
    pub async fn next_batch(&self) -> Vec<Toast> {
        loop {
            let notified = self.notify.notified();
            let batch = self.drain();
            if !batch.is_empty() {
                return batch;
            }
            notified.await;
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Toaster for ToastQueue {
    fn show(&self, toast: Toast) -> Result<(), ToastError> {
        {
            let mut queue = self.queue.lock();
            if queue.len() == self.capacity {
                queue.pop_front();
            }
            queue.push_back(toast);
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_bounded() {
        let queue = ToastQueue::with_capacity(2);
        for i in 0..3 {
            queue.show(Toast::info(format!("t{i}"))).unwrap();
        }
        let drained = queue.drain();
        assert_eq!(drained, vec![Toast::info("t1"), Toast::info("t2")]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn next_batch_waits_for_a_toast() {
        let queue = std::sync::Arc::new(ToastQueue::new());
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.next_batch().await })
        };
        tokio::task::yield_now().await;
        queue.show(Toast::success("Login successful!")).unwrap();
        let batch = waiter.await.unwrap();
        assert_eq!(batch, vec![Toast::success("Login successful!")]);
    }

    #[test]
    fn display_tags_level() {
        assert_eq!(Toast::error("Failed to logout").to_string(), "[error] Failed to logout");
    }
}
