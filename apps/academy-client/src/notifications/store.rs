use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::api::NotificationApi;
use crate::error::ApiError;
use crate::models::notification::{LiveNotification, Notification};
use crate::toast::{self, Toast, Toaster};

/// Maximum number of entries kept in the panel.
pub const NOTIFICATION_CAP: usize = 10;

/// What the notification panel renders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationSnapshot {
    /// Newest first, at most [`NOTIFICATION_CAP`] entries.
    pub items: Vec<Notification>,
    pub unread: usize,
}

#[derive(Default)]
struct State {
    user_id: Option<String>,
    items: Vec<Notification>,
    unread: usize,
}

impl State {
    fn snapshot(&self) -> NotificationSnapshot {
        NotificationSnapshot {
            items: self.items.clone(),
            unread: self.unread,
        }
    }
}

/// Merges fetched history and live events into one bounded, newest-first
/// list with an unread counter.
///
/// `unread` counts live arrivals not yet acknowledged, so an unread entry
/// evicted by the cap stays counted until the next `mark_all_read`.
pub struct NotificationStore {
    api: Arc<dyn NotificationApi>,
    toaster: Arc<dyn Toaster>,
    state: Mutex<State>,
    changes: watch::Sender<NotificationSnapshot>,
}

impl NotificationStore {
    pub fn new(api: Arc<dyn NotificationApi>, toaster: Arc<dyn Toaster>) -> Self {
        let (changes, _) = watch::channel(NotificationSnapshot::default());
        Self {
            api,
            toaster,
            state: Mutex::new(State::default()),
            changes,
        }
    }

    /// Replace the list with the persisted history for `user_id`.
    ///
    /// On failure the list is left as it was, but the store stays bound to
    /// `user_id` for later `mark_all_read` calls.
    pub async fn load_history(&self, user_id: &str) -> Result<(), ApiError> {
        self.state.lock().user_id = Some(user_id.to_string());

        let mut items = self.api.fetch_notifications(user_id).await?;
        items.sort_by_key(|n| Reverse(n.timestamp));
        let mut seen = HashSet::new();
        items.retain(|n| seen.insert(n.id.clone()));
        items.truncate(NOTIFICATION_CAP);

        let mut state = self.state.lock();
        state.unread = items.iter().filter(|n| !n.read).count();
        state.items = items;
        tracing::debug!(user_id, count = state.items.len(), unread = state.unread, "notification history loaded");
        self.publish(&state);
        Ok(())
    }

    /// Place one live event at the front of the list.
    pub fn ingest(&self, event: LiveNotification) {
        let notification = event.into_notification();
        let message = notification.message.clone();

        {
            let mut state = self.state.lock();
            let stale = notification
                .has_server_id()
                .then(|| state.items.iter().position(|n| n.id == notification.id))
                .flatten();
            if let Some(pos) = stale {
                let stale = state.items.remove(pos);
                if !stale.read {
                    state.unread = state.unread.saturating_sub(1);
                }
            }
            state.items.insert(0, notification);
            state.unread += 1;
            state.items.truncate(NOTIFICATION_CAP);
            self.publish(&state);
        }

        toast::show(self.toaster.as_ref(), Toast::success(message));
    }

    /// Persist "all read", then mark every entry currently listed, including
    /// any ingested while the call was in flight, and reset the counter.
    pub async fn mark_all_read(&self) -> Result<(), ApiError> {
        let user_id = self
            .state
            .lock()
            .user_id
            .clone()
            .ok_or_else(|| ApiError::invalid("user_id", "No user is bound to the notification panel"))?;

        self.api.mark_all_read(&user_id).await?;

        let mut state = self.state.lock();
        for n in state.items.iter_mut() {
            n.read = true;
        }
        state.unread = 0;
        self.publish(&state);
        Ok(())
    }

    /// Empty the panel locally.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.items.clear();
        state.unread = 0;
        self.publish(&state);
    }

    pub fn snapshot(&self) -> NotificationSnapshot {
        self.state.lock().snapshot()
    }

    pub fn unread(&self) -> usize {
        self.state.lock().unread
    }

    pub fn subscribe(&self) -> watch::Receiver<NotificationSnapshot> {
        self.changes.subscribe()
    }

    fn publish(&self, state: &State) {
        self.changes.send_replace(state.snapshot());
    }
}
