//! Login, registration, logout and startup hydration.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::session::{Session, SessionHandle, SessionStatus};
use crate::api::{ApiError, AuthBackend};
use crate::models::{Registration, User};

pub struct SessionStore<B> {
    handle: SessionHandle,
    backend: Arc<B>,
}

impl<B: AuthBackend> SessionStore<B> {
    pub fn new(handle: SessionHandle, backend: Arc<B>) -> Self {
        Self { handle, backend }
    }

    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    pub fn snapshot(&self) -> Session {
        self.handle.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.handle.subscribe()
    }

    /// Resolve the startup session from persisted credentials.
    ///
    /// Always leaves the session `Authenticated` or `Anonymous`. Calling it
    /// again after startup has no effect.
    pub async fn hydrate(&self) -> SessionStatus {
        let status = self.handle.status();
        if status != SessionStatus::Hydrating {
            debug!(?status, "Session already resolved, skipping hydration");
            return status;
        }
        if !self.handle.claim_hydration() {
            debug!("Hydration already in progress, waiting for it");
            return self.handle.hydrated().await;
        }

        let Some(stored) = self.handle.load_persisted() else {
            debug!("No stored credentials");
            self.handle.reset();
            return SessionStatus::Anonymous;
        };

        match self.backend.current_user(&stored.token).await {
            Ok(user) => {
                info!(user_id = user.id, "Session restored");
                self.handle.establish(stored.token, user);
                SessionStatus::Authenticated
            }
            Err(e) => {
                warn!(error = %e, "Stored credential rejected, discarding it");
                self.handle.reset();
                SessionStatus::Anonymous
            }
        }
    }

    /// Authenticate and establish a session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let response = self
            .backend
            .authenticate(email, password)
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized { message } => ApiError::InvalidCredentials { message },
                other => other,
            })?;

        let token = response.token()?;

        let user = match response.user() {
            Some(user) => user,
            None => match self.backend.current_user(&token).await {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Profile lookup after login failed, continuing with provisional profile");
                    User::provisional()
                }
            },
        };

        info!(user_id = user.id, "Logged in");
        self.handle.establish(token, user);
        Ok(self.handle.snapshot())
    }

    /// Reload the current user's profile.
    pub async fn refresh_profile(&self) -> Result<User, ApiError> {
        let token = self.handle.token().ok_or(ApiError::Unauthorized { message: None })?;
        match self.backend.current_user(&token).await {
            Ok(user) => {
                self.handle.update_profile(user.clone());
                Ok(user)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.handle.invalidate();
                }
                Err(e)
            }
        }
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, ApiError> {
        let missing = registration.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::Validation {
                message: Some(format!("Required: {}", missing.join(", "))),
            });
        }
        let message = self.backend.register(registration).await?;
        info!("Account registered");
        Ok(message)
    }

    /// Drop the session locally. Never fails.
    pub fn logout(&self) {
        self.handle.reset();
        info!("Logged out");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{BearerToken, CredentialStore, MemoryCredentialStore, StoredCredentials};
    use crate::testing::{sample_user, FakeBackend, SharedStore};
    use serde_json::json;

    fn store_with(token: &str) -> SharedStore {
        let store = SharedStore::default();
        store
            .save(&StoredCredentials::new(
                BearerToken::new(token).expect("non-empty token"),
                None,
            ))
            .expect("seed store");
        store
    }

    fn session_store(store: SharedStore, backend: FakeBackend) -> SessionStore<FakeBackend> {
        SessionStore::new(SessionHandle::new(store), Arc::new(backend))
    }

    #[tokio::test]
    async fn test_hydrate_without_token() {
        let backend = FakeBackend::new();
        let sessions = SessionStore::new(
            SessionHandle::new(MemoryCredentialStore::new()),
            Arc::new(backend.clone()),
        );
        assert_eq!(sessions.hydrate().await, SessionStatus::Anonymous);
        assert_eq!(backend.calls("current_user"), 0);
    }

    #[tokio::test]
    async fn test_hydrate_with_valid_token() {
        let backend = FakeBackend::new();
        backend.set_me(Ok(sample_user()));
        let sessions = session_store(store_with("abc123"), backend.clone());

        assert_eq!(sessions.hydrate().await, SessionStatus::Authenticated);
        let session = sessions.snapshot();
        assert_eq!(session.user(), Some(&sample_user()));
        assert_eq!(session.token().map(|t| t.header_value()), Some("Bearer abc123"));
        assert_eq!(backend.last_token().as_deref(), Some("Bearer abc123"));
    }

    #[tokio::test]
    async fn test_hydrate_with_expired_token_discards_it() {
        let backend = FakeBackend::new();
        backend.set_me(Err(ApiError::Unauthorized { message: None }));
        let store = store_with("expired");
        let sessions = session_store(store.clone(), backend);

        assert_eq!(sessions.hydrate().await, SessionStatus::Anonymous);
        assert!(store.load().expect("load").is_none());
    }

    #[tokio::test]
    async fn test_hydrate_with_network_failure_discards_token() {
        let backend = FakeBackend::new();
        backend.set_me(Err(ApiError::Network("connection refused".to_string())));
        let store = store_with("abc");
        let sessions = session_store(store.clone(), backend);

        assert_eq!(sessions.hydrate().await, SessionStatus::Anonymous);
        assert!(store.load().expect("load").is_none());
    }

    #[tokio::test]
    async fn test_hydrate_runs_once() {
        let backend = FakeBackend::new();
        backend.set_me(Ok(sample_user()));
        let sessions = session_store(store_with("abc"), backend.clone());

        sessions.hydrate().await;
        sessions.logout();
        assert_eq!(sessions.hydrate().await, SessionStatus::Anonymous);
        assert_eq!(backend.calls("current_user"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_hydrate_looks_up_once() {
        let backend = FakeBackend::new();
        backend.set_me(Ok(sample_user()));
        let sessions = session_store(store_with("abc"), backend.clone());

        let (first, second) = tokio::join!(sessions.hydrate(), sessions.hydrate());
        assert_eq!(first, SessionStatus::Authenticated);
        assert_eq!(second, SessionStatus::Authenticated);
        assert_eq!(backend.calls("current_user"), 1);
    }

    #[tokio::test]
    async fn test_login_with_inline_user() {
        let backend = FakeBackend::new();
        backend.set_login(Ok(json!({"token": "abc123", "user": {"id": 9, "name": "Lia", "email": "lia@example.com"}})));
        let store = SharedStore::default();
        let sessions = session_store(store.clone(), backend.clone());
        sessions.hydrate().await;

        let session = sessions.login("lia@example.com", "pw").await.expect("login succeeds");
        assert!(session.is_authenticated());
        assert_eq!(session.user().map(|u| u.id), Some(9));
        assert_eq!(backend.calls("current_user"), 0);

        let stored = store.load().expect("load").expect("token persisted");
        assert_eq!(stored.token.header_value(), "Bearer abc123");
    }

    #[tokio::test]
    async fn test_login_accepts_access_token_and_fetches_profile() {
        let backend = FakeBackend::new();
        backend.set_login(Ok(json!({"access_token": "xyz"})));
        backend.set_me(Ok(sample_user()));
        let sessions = session_store(SharedStore::default(), backend.clone());

        let session = sessions.login("a@b.c", "pw").await.expect("login succeeds");
        assert_eq!(session.user(), Some(&sample_user()));
        assert_eq!(backend.last_token().as_deref(), Some("Bearer xyz"));
    }

    #[tokio::test]
    async fn test_login_survives_failed_profile_lookup() {
        let backend = FakeBackend::new();
        backend.set_login(Ok(json!({"token": "Bearer t0k"})));
        backend.set_me(Err(ApiError::Network("timeout".to_string())));
        let sessions = session_store(SharedStore::default(), backend);

        let session = sessions.login("a@b.c", "pw").await.expect("login still succeeds");
        assert!(session.is_authenticated());
        assert!(session.profile_is_provisional());
    }

    #[tokio::test]
    async fn test_login_without_token_is_protocol_error() {
        let backend = FakeBackend::new();
        backend.set_login(Ok(json!({"message": "ok"})));
        let store = SharedStore::default();
        let sessions = session_store(store.clone(), backend);
        sessions.hydrate().await;

        let err = sessions.login("a@b.c", "pw").await.expect_err("no token");
        assert!(matches!(err, ApiError::AuthProtocol(_)));
        assert_eq!(sessions.snapshot().status(), SessionStatus::Anonymous);
        assert!(store.load().expect("load").is_none());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let backend = FakeBackend::new();
        backend.set_login(Err(ApiError::Unauthorized {
            message: Some("Email atau password salah".to_string()),
        }));
        let sessions = session_store(SharedStore::default(), backend);

        match sessions.login("a@b.c", "bad").await {
            Err(ApiError::InvalidCredentials { message }) => {
                assert_eq!(message.as_deref(), Some("Email atau password salah"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_register_validates_and_does_not_log_in() {
        let backend = FakeBackend::new();
        let sessions = session_store(SharedStore::default(), backend.clone());
        sessions.hydrate().await;

        let blank = Registration {
            name: String::new(),
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(
            sessions.register(&blank).await,
            Err(ApiError::Validation { .. })
        ));
        assert_eq!(backend.calls("register"), 0);

        let ok = Registration {
            name: "Ani".to_string(),
            ..blank
        };
        sessions.register(&ok).await.expect("register succeeds");
        assert_eq!(sessions.snapshot().status(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let backend = FakeBackend::new();
        backend.set_register(Err(ApiError::Conflict {
            message: Some("Email already registered".to_string()),
        }));
        let sessions = session_store(SharedStore::default(), backend);
        let reg = Registration {
            name: "Ani".to_string(),
            email: "a@b.c".to_string(),
            password: "pw".to_string(),
        };
        assert!(matches!(
            sessions.register(&reg).await,
            Err(ApiError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_storage() {
        let backend = FakeBackend::new();
        backend.set_me(Ok(sample_user()));
        let store = store_with("abc");
        let sessions = session_store(store.clone(), backend);
        sessions.hydrate().await;

        sessions.logout();
        assert_eq!(sessions.snapshot(), Session::anonymous());
        assert!(store.load().expect("load").is_none());
    }

    #[tokio::test]
    async fn test_refresh_profile_unauthorized_ends_session() {
        let backend = FakeBackend::new();
        backend.set_me(Ok(sample_user()));
        let sessions = session_store(store_with("abc"), backend.clone());
        sessions.hydrate().await;

        backend.set_me(Err(ApiError::Unauthorized { message: None }));
        assert!(sessions.refresh_profile().await.is_err());
        assert_eq!(sessions.snapshot().status(), SessionStatus::Anonymous);
    }
}
