use reqwest::Method;
use serde::Serialize;

use super::{HttpApi, Reply};
use crate::error::ApiError;
use crate::models::student::UserProfile;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePassword<'a> {
    old_password: &'a str,
    new_password: &'a str,
}

impl HttpApi {
    pub async fn profile(&self) -> Result<UserProfile, ApiError> {
        Ok(self.get::<UserProfile>("profile").await?.data)
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<Reply<()>, ApiError> {
        self.ack(
            Method::POST,
            "profile/change-password",
            &ChangePassword {
                old_password,
                new_password,
            },
        )
        .await
    }
}
