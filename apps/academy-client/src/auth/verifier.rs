use std::sync::Arc;

use crate::api::SessionApi;
use crate::models::session::Session;

/// Answers "who is this session" with one `auth/verify` call per invocation.
#[derive(Clone)]
pub struct SessionVerifier {
    api: Arc<dyn SessionApi>,
}

impl SessionVerifier {
    pub fn new(api: Arc<dyn SessionApi>) -> Self {
        Self { api }
    }

    /// Never cached. Any failure is reported as an anonymous session.
    pub async fn verify(&self) -> Session {
        match self.api.verify().await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, role = %user.role, "session verified");
                Session::authenticated(user.id, user.role)
            }
            Err(err) if err.is_unauthorized() => {
                tracing::debug!("no active session");
                Session::anonymous()
            }
            Err(err) => {
                tracing::warn!(?err, "session verification failed");
                Session::anonymous()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use reqwest::StatusCode;

    use super::*;
    use crate::api::VerifiedUser;
    use crate::error::ApiError;
    use crate::models::session::Role;

    struct Scripted {
        calls: AtomicUsize,
        reply: fn() -> Result<VerifiedUser, ApiError>,
    }

    #[async_trait]
    impl SessionApi for Scripted {
        async fn verify(&self) -> Result<VerifiedUser, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.reply)()
        }
    }

    fn verifier(reply: fn() -> Result<VerifiedUser, ApiError>) -> (Arc<Scripted>, SessionVerifier) {
        let api = Arc::new(Scripted {
            calls: AtomicUsize::new(0),
            reply,
        });
        (api.clone(), SessionVerifier::new(api))
    }

    #[tokio::test]
    async fn verified_user_becomes_session() {
        let (_, verifier) = verifier(|| {
            Ok(VerifiedUser {
                id: "u1".into(),
                role: Role::Admin,
            })
        });
        assert_eq!(verifier.verify().await, Session::authenticated("u1", Role::Admin));
    }

    #[tokio::test]
    async fn fails_closed() {
        for reply in [
            (|| Err(ApiError::transport("connection refused"))) as fn() -> _,
            || Err(ApiError::unauthorized(StatusCode::UNAUTHORIZED, None)),
            || Err(ApiError::rejected(Some(StatusCode::INTERNAL_SERVER_ERROR), None)),
            || Err(ApiError::decode("missing role")),
        ] {
            let (_, verifier) = verifier(reply);
            assert_eq!(verifier.verify().await, Session::anonymous());
        }
    }

    #[tokio::test]
    async fn every_call_hits_the_server() {
        let (api, verifier) = verifier(|| {
            Ok(VerifiedUser {
                id: "u1".into(),
                role: Role::Student,
            })
        });
        verifier.verify().await;
        verifier.verify().await;
        assert_eq!(api.calls.load(Ordering::SeqCst), 2);
    }
}
