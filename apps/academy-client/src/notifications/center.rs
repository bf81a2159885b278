use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::store::{NotificationSnapshot, NotificationStore};
use crate::error::ApiError;
use crate::gateway::{ChannelError, ChannelStatus, NotificationChannel};
use crate::toast::{self, Toast, Toaster};

pub const OFFLINE_MESSAGE: &str = "Live notifications are offline. Reload to reconnect.";

/// Owns the channel and store for one signed-in user and wires them
/// together.
pub struct NotificationCenter {
    store: Arc<NotificationStore>,
    channel: NotificationChannel,
    toaster: Arc<dyn Toaster>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl NotificationCenter {
    pub fn new(store: Arc<NotificationStore>, channel: NotificationChannel, toaster: Arc<dyn Toaster>) -> Self {
        Self {
            store,
            channel,
            toaster,
            watcher: Mutex::new(None),
        }
    }

    /// Load history, then go live. The channel is only opened once the
    /// history fetch has finished, so no live event can be overwritten by it.
    pub async fn start(&self, user_id: &str) -> Result<(), ChannelError> {
        if let Err(err) = self.store.load_history(user_id).await {
            tracing::warn!(user_id, %err, "failed to load notification history");
        }

        let store = self.store.clone();
        self.channel.set_listener(move |event| store.ingest(event));
        self.watch_offline();
        self.channel.open(user_id)
    }

    /// Opening the panel marks everything read.
    pub async fn open_panel(&self) -> Result<NotificationSnapshot, ApiError> {
        self.store.mark_all_read().await?;
        Ok(self.store.snapshot())
    }

    pub fn clear(&self) {
        self.store.clear();
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.store.snapshot()
    }

    pub fn store(&self) -> &Arc<NotificationStore> {
        &self.store
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Tear down on logout or unmount.
    pub fn stop(&self) {
        self.channel.close();
        if let Some(watcher) = self.watcher.lock().take() {
            watcher.abort();
        }
    }

    fn watch_offline(&self) {
        let mut status = self.channel.status();
        let toaster = self.toaster.clone();
        let task = tokio::spawn(async move {
            let mut was_offline = false;
            while status.changed().await.is_ok() {
                let offline = matches!(*status.borrow_and_update(), ChannelStatus::Offline { .. });
                if offline && !was_offline {
                    toast::show(toaster.as_ref(), Toast::error(OFFLINE_MESSAGE));
                }
                was_offline = offline;
            }
        });
        if let Some(previous) = self.watcher.lock().replace(task) {
            previous.abort();
        }
    }
}

impl Drop for NotificationCenter {
    fn drop(&mut self) {
        self.stop();
    }
}
