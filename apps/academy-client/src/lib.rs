pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod models;
pub mod notifications;
pub mod storage;
pub mod toast;
pub mod views;

use std::sync::Arc;

use api::HttpApi;
use auth::{AuthStatusStore, RouteGuard, SessionVerifier};
use config::Config;
use error::ApiError;
use gateway::NotificationChannel;
use notifications::{NotificationCenter, NotificationStore};
use storage::LocalStorage;
use toast::Toaster;
use views::Confirm;

/// Shared services handed to every view.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub api: Arc<HttpApi>,
    pub toasts: Arc<dyn Toaster>,
    pub auth_status: AuthStatusStore,
    pub confirm: Arc<dyn Confirm>,
}

impl AppContext {
    pub fn new(
        config: Config,
        storage: Arc<dyn LocalStorage>,
        toasts: Arc<dyn Toaster>,
        confirm: Arc<dyn Confirm>,
    ) -> Result<Self, ApiError> {
        let api = Arc::new(HttpApi::new(&config)?);
        Ok(Self {
            config: Arc::new(config),
            api,
            toasts,
            auth_status: AuthStatusStore::new(storage),
            confirm,
        })
    }

    pub fn verifier(&self) -> SessionVerifier {
        SessionVerifier::new(self.api.clone())
    }

    pub fn route_guard(&self) -> RouteGuard {
        RouteGuard::new(self.verifier())
    }

    /// A fresh, unopened notification center for one session.
    pub fn notification_center(&self) -> NotificationCenter {
        let store = Arc::new(NotificationStore::new(self.api.clone(), self.toasts.clone()));
        let channel = NotificationChannel::new(self.config.channel_url.clone(), self.config.reconnect);
        NotificationCenter::new(store, channel, self.toasts.clone())
    }
}
