pub mod backoff;
pub mod channel;
pub mod events;

pub use backoff::ReconnectPolicy;
pub use channel::{ChannelError, ChannelStatus, Listener, NotificationChannel};
