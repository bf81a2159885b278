pub mod center;
pub mod store;

pub use center::NotificationCenter;
pub use store::{NotificationSnapshot, NotificationStore, NOTIFICATION_CAP};
