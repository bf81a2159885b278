//! Single live connection to the notification endpoint.
//!
//! A [`NotificationChannel`] owns at most one connection task. The task
//! authenticates right after every (re)connect, routes dispatches to the
//! current listener and reconnects with exponential backoff until the
//! policy is exhausted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Sink, SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};

use super::backoff::ReconnectPolicy;
use super::events::{parse_frame, ClientFrame};
use crate::models::notification::LiveNotification;

/// Receives every recognized event. At most one is registered at a time.
pub type Listener = Arc<dyn Fn(LiveNotification) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelStatus {
    Idle,
    Connecting,
    Connected { user_id: String },
    Reconnecting { attempt: u32, delay: Duration },
    /// Reconnection gave up; `open` starts over.
    Offline { attempts: u32 },
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("no tokio runtime to drive the channel")]
    NoRuntime,
    #[error("websocket error: {0}")]
    Socket(#[from] tungstenite::Error),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

enum Command {
    Authenticate(String),
    Close,
}

struct Running {
    user_id: String,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Running {
    fn is_live(&self) -> bool {
        !self.commands.is_closed() && !self.task.is_finished()
    }
}

/// Status shared with the connection task. Updates from a task that has
/// been superseded by `close` or a newer `open` are dropped.
struct StatusCell {
    tx: watch::Sender<ChannelStatus>,
    generation: AtomicU64,
}

impl StatusCell {
    fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn set(&self, generation: u64, status: ChannelStatus) {
        self.tx.send_if_modified(|current| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            *current = status;
            true
        });
    }

    fn retire(&self, status: ChannelStatus) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(status);
    }
}

pub struct NotificationChannel {
    url: String,
    policy: ReconnectPolicy,
    running: Mutex<Option<Running>>,
    listener: Arc<Mutex<Option<Listener>>>,
    status: Arc<StatusCell>,
}

impl NotificationChannel {
    pub fn new(url: impl Into<String>, policy: ReconnectPolicy) -> Self {
        let (tx, _) = watch::channel(ChannelStatus::Idle);
        Self {
            url: url.into(),
            policy,
            running: Mutex::new(None),
            listener: Arc::new(Mutex::new(None)),
            status: Arc::new(StatusCell {
                tx,
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Bind the channel to `user_id`, connecting if needed.
    ///
    /// Returns immediately; the handshake completes in the background. On a
    /// live channel a different id is re-authenticated without reconnecting
    /// and the same id is a no-op.
    pub fn open(&self, user_id: &str) -> Result<(), ChannelError> {
        let mut running = self.running.lock();

        if let Some(current) = running.as_mut().filter(|r| r.is_live()) {
            if current.user_id != user_id {
                tracing::debug!(user_id, "switching channel identity");
                current.user_id = user_id.to_string();
                // The task collapses queued ids while it is not connected.
                let _ = current.commands.send(Command::Authenticate(user_id.to_string()));
            }
            return Ok(());
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ChannelError::NoRuntime)?;
        let (commands, rx) = mpsc::unbounded_channel();
        let generation = self.status.begin();
        self.status.set(generation, ChannelStatus::Connecting);

        let conn = Connection {
            url: self.url.clone(),
            policy: self.policy,
            user_id: user_id.to_string(),
            commands: rx,
            listener: self.listener.clone(),
            status: self.status.clone(),
            generation,
        };
        let task = runtime.spawn(conn.run());

        *running = Some(Running {
            user_id: user_id.to_string(),
            commands,
            task,
        });
        Ok(())
    }

    /// Replace the listener. Events are never buffered for a missing one.
    pub fn set_listener(&self, listener: impl Fn(LiveNotification) + Send + Sync + 'static) {
        *self.listener.lock() = Some(Arc::new(listener));
    }

    pub fn clear_listener(&self) {
        self.listener.lock().take();
    }

    /// Tear down the connection and drop the listener. Idempotent.
    pub fn close(&self) {
        self.listener.lock().take();
        let Some(running) = self.running.lock().take() else {
            return;
        };
        self.status.retire(ChannelStatus::Closed);
        if running.commands.send(Command::Close).is_err() {
            // Task already gone (offline).
            return;
        }
        tracing::debug!(user_id = %running.user_id, "closing notification channel");
    }

    pub fn status(&self) -> watch::Receiver<ChannelStatus> {
        self.status.tx.subscribe()
    }

    pub fn current_status(&self) -> ChannelStatus {
        self.status.tx.borrow().clone()
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Drop for NotificationChannel {
    fn drop(&mut self) {
        self.close();
    }
}

// ---------------------------------------------------------------------------
// Connection task
// ---------------------------------------------------------------------------

struct Connection {
    url: String,
    policy: ReconnectPolicy,
    user_id: String,
    commands: mpsc::UnboundedReceiver<Command>,
    listener: Arc<Mutex<Option<Listener>>>,
    status: Arc<StatusCell>,
    generation: u64,
}

/// Why a connection attempt or session ended.
enum Outcome {
    Closed,
    Dropped,
}

impl Connection {
    async fn run(mut self) {
        let mut failures = 0u32;

        loop {
            match self.connect_and_serve(&mut failures).await {
                Outcome::Closed => return,
                Outcome::Dropped => {}
            }

            failures += 1;
            if self.policy.exhausted(failures) {
                tracing::warn!(attempts = failures, "notification channel offline");
                self.set_status(ChannelStatus::Offline { attempts: failures });
                return;
            }

            let delay = self.policy.delay_for(failures);
            tracing::info!(
                attempt = failures,
                delay_ms = delay.as_millis() as u64,
                "reconnecting notification channel"
            );
            self.set_status(ChannelStatus::Reconnecting {
                attempt: failures,
                delay,
            });

            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    cmd = self.commands.recv() => match cmd {
                        Some(Command::Authenticate(id)) => self.user_id = id,
                        Some(Command::Close) | None => return,
                    },
                }
            }
            self.set_status(ChannelStatus::Connecting);
        }
    }

    /// One connection: connect, authenticate, then serve until it ends.
    /// Resets `failures` once the server sends a frame or the session has
    /// stayed up for `stable_after`; an accepted socket alone is not enough.
    async fn connect_and_serve(&mut self, failures: &mut u32) -> Outcome {
        let connecting = connect_async(self.url.as_str());
        tokio::pin!(connecting);

        let result = loop {
            tokio::select! {
                result = &mut connecting => break result,
                cmd = self.commands.recv() => match cmd {
                    // Only the latest identity is sent once connected.
                    Some(Command::Authenticate(id)) => self.user_id = id,
                    Some(Command::Close) | None => return Outcome::Closed,
                },
            }
        };

        let stream = match result {
            Ok((stream, _)) => stream,
            Err(err) => {
                tracing::error!(url = %self.url, error = %err, "channel connect_error");
                return Outcome::Dropped;
            }
        };
        let (mut write, mut read) = stream.split();
        if let Err(err) = send_authenticate(&mut write, &self.user_id).await {
            tracing::error!(error = %err, "failed to authenticate channel");
            return Outcome::Dropped;
        }
        tracing::info!(user_id = %self.user_id, "channel connected");
        self.set_status(ChannelStatus::Connected {
            user_id: self.user_id.clone(),
        });

        let stable = tokio::time::sleep(self.policy.stable_after);
        tokio::pin!(stable);
        let mut settled = false;

        loop {
            tokio::select! {
                _ = &mut stable, if !settled => {
                    settled = true;
                    *failures = 0;
                }
                frame = read.next() => match frame {
                    Some(Ok(Message::Text(text))) => {
                        settled = true;
                        *failures = 0;
                        self.dispatch(text.as_str());
                    }
                    Some(Ok(Message::Ping(data))) => {
                        settled = true;
                        *failures = 0;
                        let _ = write.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(user_id = %self.user_id, "channel disconnected");
                        return Outcome::Dropped;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::error!(error = %err, "channel transport error");
                        return Outcome::Dropped;
                    }
                },
                cmd = self.commands.recv() => match cmd {
                    Some(Command::Authenticate(id)) => {
                        if id == self.user_id {
                            continue;
                        }
                        self.user_id = id;
                        if let Err(err) = send_authenticate(&mut write, &self.user_id).await {
                            tracing::error!(error = %err, "failed to re-authenticate channel");
                            return Outcome::Dropped;
                        }
                        self.set_status(ChannelStatus::Connected {
                            user_id: self.user_id.clone(),
                        });
                    }
                    Some(Command::Close) | None => {
                        let _ = write.send(Message::Close(None)).await;
                        let _ = write.close().await;
                        tracing::info!(user_id = %self.user_id, "channel disconnected");
                        return Outcome::Closed;
                    }
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        let event = match parse_frame(text) {
            Ok(Some(event)) => event,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed channel event");
                return;
            }
        };
        tracing::debug!(event = event.kind.event_name(), "channel event");

        // Resolve the listener at dispatch time and call it outside the lock.
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => listener(event),
            None => tracing::debug!("no listener registered; event dropped"),
        }
    }

    fn set_status(&self, status: ChannelStatus) {
        self.status.set(self.generation, status);
    }
}

async fn send_authenticate<S>(write: &mut S, user_id: &str) -> Result<(), ChannelError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = serde_json::to_string(&ClientFrame::authenticate(user_id))?;
    write.send(Message::Text(frame.into())).await?;
    tracing::debug!(user_id, "sent authenticate");
    Ok(())
}
