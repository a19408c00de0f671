//! Session snapshot and the shared handle that owns it.
//!
//! The handle is the single place that writes session state. It persists
//! through a `CredentialStore` first and only then publishes the new snapshot
//! to subscribers, so storage never lags behind what the UI shows.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::credentials::{CredentialStore, StoredCredentials};
use super::BearerToken;
use crate::api::ApiError;
use crate::models::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Startup, before the persisted credential has been checked
    Hydrating,
    Authenticated,
    Anonymous,
}

/// Immutable view of who is logged in.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    status: SessionStatus,
    token: Option<BearerToken>,
    user: Option<User>,
}

impl Session {
    pub fn hydrating() -> Self {
        Self {
            status: SessionStatus::Hydrating,
            token: None,
            user: None,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            status: SessionStatus::Anonymous,
            token: None,
            user: None,
        }
    }

    pub fn authenticated(token: BearerToken, user: User) -> Self {
        Self {
            status: SessionStatus::Authenticated,
            token: Some(token),
            user: Some(user),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.token.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// Logged in, but the profile lookup after login did not succeed.
    pub fn profile_is_provisional(&self) -> bool {
        self.user.as_ref().map(User::is_provisional).unwrap_or(false)
    }

    /// Route guard: the current user, or `Unauthorized` when logged out.
    pub fn require_user(&self) -> Result<&User, ApiError> {
        match (self.status, self.user.as_ref()) {
            (SessionStatus::Authenticated, Some(user)) => Ok(user),
            _ => Err(ApiError::Unauthorized {
                message: Some("Please log in first.".to_string()),
            }),
        }
    }
}

struct Inner {
    store: Box<dyn CredentialStore>,
    state: watch::Sender<Session>,
    hydration_claimed: AtomicBool,
}

/// Cloneable handle to the process-wide session state.
///
/// Shared between the `SessionStore`, which drives login/logout, and the
/// `ApiClient`, which reads the token for every request and ends the session
/// when the server rejects it.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

impl SessionHandle {
    pub fn new(store: impl CredentialStore + 'static) -> Self {
        let (state, _) = watch::channel(Session::hydrating());
        Self {
            inner: Arc::new(Inner {
                store: Box::new(store),
                state,
                hydration_claimed: AtomicBool::new(false),
            }),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Token to authorize outbound requests with, read fresh on every call.
    pub fn token(&self) -> Option<BearerToken> {
        self.inner.state.borrow().token.clone()
    }

    /// Claim the startup hydration. Only the first caller gets `true`.
    pub(crate) fn claim_hydration(&self) -> bool {
        !self.inner.hydration_claimed.swap(true, Ordering::AcqRel)
    }

    /// Wait until startup hydration has resolved the session.
    pub(crate) async fn hydrated(&self) -> SessionStatus {
        let mut rx = self.subscribe();
        let status = match rx.wait_for(|s| s.status != SessionStatus::Hydrating).await {
            Ok(session) => session.status,
            Err(_) => self.status(),
        };
        status
    }

    /// Persisted credentials; an unreadable store counts as empty.
    pub(crate) fn load_persisted(&self) -> Option<StoredCredentials> {
        match self.inner.store.load() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!(error = %e, "Failed to load stored credentials");
                None
            }
        }
    }

    /// Persist and publish an authenticated session.
    pub(crate) fn establish(&self, token: BearerToken, user: User) {
        let credentials = StoredCredentials::new(token.clone(), Some(user.clone()));
        if let Err(e) = self.inner.store.save(&credentials) {
            warn!(error = %e, "Failed to save session");
        }
        self.inner.state.send_replace(Session::authenticated(token, user));
        debug!("Session authenticated");
    }

    /// Replace the profile of an authenticated session, keeping the token.
    pub(crate) fn update_profile(&self, user: User) {
        let Some(token) = self.token().filter(|_| self.status() == SessionStatus::Authenticated)
        else {
            debug!("Ignoring profile update for a session that is not authenticated");
            return;
        };
        self.establish(token, user);
    }

    /// Clear storage and publish an anonymous session.
    pub(crate) fn reset(&self) {
        if let Err(e) = self.inner.store.clear() {
            warn!(error = %e, "Failed to clear stored credentials");
        }
        self.inner.state.send_replace(Session::anonymous());
    }

    /// The server rejected the credential on an authenticated request.
    ///
    /// Startup resolution is left to `hydrate`, which handles its own failure.
    pub fn invalidate(&self) {
        if self.status() == SessionStatus::Hydrating {
            return;
        }
        let was_authenticated = self.status() == SessionStatus::Authenticated;
        self.reset();
        if was_authenticated {
            info!("Session ended: credential rejected by server");
        }
    }

    /// Like `invalidate`, but only while `rejected` is still the current
    /// credential. A 401 for a request sent before a re-login is ignored.
    pub fn invalidate_if(&self, rejected: &BearerToken) {
        if self.token().as_ref() != Some(rejected) {
            debug!("Ignoring rejection of a credential that is no longer current");
            return;
        }
        self.invalidate();
    }
}
