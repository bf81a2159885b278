use parking_lot::Mutex;

use crate::error::ApiError;
use crate::models::student::UserProfile;
use crate::toast::{self, Toast};
use crate::AppContext;

use super::{FormError, InFlight};

const MIN_PASSWORD: usize = 3;

pub struct ProfileView {
    ctx: AppContext,
    in_flight: InFlight,
    profile: Mutex<Option<UserProfile>>,
}

impl ProfileView {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            in_flight: InFlight::new(),
            profile: Mutex::new(None),
        }
    }

    pub async fn load(&self) -> Result<UserProfile, ApiError> {
        match self.ctx.api.profile().await {
            Ok(profile) => {
                *self.profile.lock() = Some(profile.clone());
                Ok(profile)
            }
            Err(err) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::error("Failed to fetch profile"));
                Err(err)
            }
        }
    }

    pub fn profile(&self) -> Option<UserProfile> {
        self.profile.lock().clone()
    }

    /// Mismatched or short passwords, and a second submission while one is
    /// pending, are rejected before any request.
    pub async fn change_password(&self, old: &str, new: &str, confirm: &str) -> Result<(), FormError> {
        if new != confirm {
            return Err(ApiError::invalid("confirm_password", "New passwords do not match").into());
        }
        if new.chars().count() < MIN_PASSWORD {
            return Err(ApiError::invalid("new_password", "Password must be at least 3 characters long").into());
        }
        let Some(_guard) = self.in_flight.begin("change-password") else {
            return Err(ApiError::busy().into());
        };

        match self.ctx.api.change_password(old, new).await {
            Ok(_) => {
                toast::show(self.ctx.toasts.as_ref(), Toast::success("Password changed successfully"));
                Ok(())
            }
            Err(err) => {
                let err = FormError::new(err, "Failed to change password");
                toast::show(self.ctx.toasts.as_ref(), Toast::error(err.message.clone()));
                Err(err)
            }
        }
    }
}
