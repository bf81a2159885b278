use crate::api::SessionApi;
use crate::auth::{AuthEventKind, Route};
use crate::error::ApiError;
use crate::models::session::Role;
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{FormError, InFlight};

pub const LOGIN_FAILED: &str = "Invalid email or password";
pub const REGISTER_FAILED: &str = "An unexpected error occurred. Please try again.";
pub const GOOGLE_LOGIN_FAILED: &str = "Google sign-in failed";
const MIN_REGISTER_PASSWORD: usize = 4;

/// Login, registration and logout for both portals.
pub struct AuthFlow {
    ctx: AppContext,
    in_flight: InFlight,
}

impl AuthFlow {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
        }
    }

    /// Sign in through `portal` and return the dashboard to open.
    ///
    /// The role recorded locally is the one the server verifies, falling back
    /// to the portal's role if verification fails.
    pub async fn login(&self, portal: Role, email: &str, password: &str) -> Result<Route, FormError> {
        let Some(_guard) = self.in_flight.begin("login") else {
            return Err(ApiError::busy().into());
        };
        self.ctx
            .api
            .login(email, password)
            .await
            .map_err(|err| FormError::new(err, LOGIN_FAILED))?;

        Ok(self.signed_in(portal).await)
    }

    /// Sign in with a Google ID token. Google accounts are students unless
    /// the server says otherwise.
    pub async fn login_with_google(&self, token: &str) -> Result<Route, FormError> {
        let Some(_guard) = self.in_flight.begin("login") else {
            return Err(ApiError::busy().into());
        };
        if let Err(err) = self.ctx.api.google_login(token).await {
            let err = FormError::new(err, GOOGLE_LOGIN_FAILED);
            toast::show(self.ctx.toasts.as_ref(), Toast::error(err.message.clone()));
            return Err(err);
        }

        Ok(self.signed_in(Role::Student).await)
    }

    async fn signed_in(&self, portal: Role) -> Route {
        let role = match self.ctx.api.verify().await {
            Ok(user) => user.role,
            Err(err) => {
                tracing::warn!(%err, "could not verify session after login");
                portal
            }
        };
        tracing::info!(%role, %portal, "logged in");

        self.record(role, true, AuthEventKind::Login).await;
        toast::show(self.ctx.toasts.as_ref(), Toast::success("Login successful!"));
        Route::dashboard_for(Some(role))
    }

    /// Create a student account; on success the login view is next.
    pub async fn register(&self, name: &str, email: &str, password: &str, confirm: &str) -> Result<Route, FormError> {
        if password != confirm {
            return Err(ApiError::invalid("confirm_password", "Passwords do not match.").into());
        }
        if password.chars().count() < MIN_REGISTER_PASSWORD {
            return Err(ApiError::invalid(
                "password",
                "Password must be at least 4 characters long.",
            )
            .into());
        }
        let Some(_guard) = self.in_flight.begin("register") else {
            return Err(ApiError::busy().into());
        };

        match self.ctx.api.register(name, email, password).await {
            Ok(_) => {
                toast::show(
                    self.ctx.toasts.as_ref(),
                    Toast::success("Registration successful! Redirecting to login..."),
                );
                Ok(Route::Login)
            }
            Err(err) => {
                let err = FormError::new(err, REGISTER_FAILED);
                toast::show(self.ctx.toasts.as_ref(), Toast::error(err.message.clone()));
                Err(err)
            }
        }
    }

    /// Sign out of `role`'s portal and return the view to show next.
    pub async fn logout(&self, role: Role) -> Result<Route, ApiError> {
        if let Err(err) = self.ctx.api.logout().await {
            tracing::warn!(%role, %err, "logout failed");
            toast::show(self.ctx.toasts.as_ref(), Toast::error("Failed to logout"));
            return Err(err);
        }

        self.record(role, false, AuthEventKind::Logout).await;
        toast::show(self.ctx.toasts.as_ref(), Toast::success("Logout successful!"));
        Ok(match role {
            Role::Admin => Route::AdminLogoutLogin,
            Role::Student => Route::Logout,
        })
    }

    async fn record(&self, role: Role, signed_in: bool, kind: AuthEventKind) {
        let status = &self.ctx.auth_status;
        let written = if signed_in {
            status.set_status(role, true).await
        } else {
            status.clear(role).await
        };
        if let Err(err) = written {
            tracing::warn!(%role, %err, "failed to write auth status");
        }
        if let Err(err) = status.broadcast(kind, role).await {
            tracing::warn!(%role, %err, "failed to broadcast auth change");
        }
    }
}
