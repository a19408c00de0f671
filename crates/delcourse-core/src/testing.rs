//! In-memory collaborators shared by unit tests.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::api::{ApiError, AuthBackend, CourseBackend};
use crate::auth::{
    BearerToken, CredentialStore, LoginResponse, MemoryCredentialStore, StoredCredentials,
};
use crate::models::{Course, CourseId, Rating, RatingReceipt, Registration, User};

/// A memory store whose contents stay visible to the test after the
/// session handle takes ownership of a clone.
#[derive(Clone, Default)]
pub(crate) struct SharedStore(Arc<MemoryCredentialStore>);

impl CredentialStore for SharedStore {
    fn load(&self) -> Result<Option<StoredCredentials>> {
        self.0.load()
    }

    fn save(&self, credentials: &StoredCredentials) -> Result<()> {
        self.0.save(credentials)
    }

    fn clear(&self) -> Result<()> {
        self.0.clear()
    }
}

pub(crate) fn sample_user() -> User {
    User {
        id: 1,
        name: "Budi Santoso".to_string(),
        email: "budi@example.com".to_string(),
        created_at: Some("2024-03-01 10:00:00".to_string()),
        photo: None,
    }
}

struct State {
    me: Result<User, ApiError>,
    login: Result<Value, ApiError>,
    register: Result<Option<String>, ApiError>,
    course: Result<Course, ApiError>,
    join: Result<Option<String>, ApiError>,
    leave: Result<Option<String>, ApiError>,
    rate: Result<RatingReceipt, ApiError>,
    calls: HashMap<&'static str, usize>,
    last_token: Option<String>,
    last_rating: Option<Rating>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            me: Err(ApiError::Unauthorized { message: None }),
            login: Err(ApiError::Unauthorized { message: None }),
            register: Ok(None),
            course: Ok(Course::default()),
            join: Ok(None),
            leave: Ok(None),
            rate: Ok(RatingReceipt::default()),
            calls: HashMap::new(),
            last_token: None,
            last_rating: None,
        }
    }
}

/// Scripted backend: each call returns the configured result and is counted.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<State>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_me(&self, result: Result<User, ApiError>) {
        self.state.lock().me = result;
    }

    pub(crate) fn set_login(&self, result: Result<Value, ApiError>) {
        self.state.lock().login = result;
    }

    pub(crate) fn set_register(&self, result: Result<Option<String>, ApiError>) {
        self.state.lock().register = result;
    }

    pub(crate) fn set_course(&self, result: Result<Course, ApiError>) {
        self.state.lock().course = result;
    }

    pub(crate) fn set_join(&self, result: Result<Option<String>, ApiError>) {
        self.state.lock().join = result;
    }

    pub(crate) fn set_leave(&self, result: Result<Option<String>, ApiError>) {
        self.state.lock().leave = result;
    }

    pub(crate) fn set_rate(&self, result: Result<RatingReceipt, ApiError>) {
        self.state.lock().rate = result;
    }

    pub(crate) fn calls(&self, name: &str) -> usize {
        self.state.lock().calls.get(name).copied().unwrap_or(0)
    }

    /// Authorization header value of the last identity lookup.
    pub(crate) fn last_token(&self) -> Option<String> {
        self.state.lock().last_token.clone()
    }

    pub(crate) fn last_rating(&self) -> Option<Rating> {
        self.state.lock().last_rating.clone()
    }

    fn record(&self, name: &'static str) -> parking_lot::MutexGuard<'_, State> {
        let mut state = self.state.lock();
        *state.calls.entry(name).or_insert(0) += 1;
        state
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn current_user(&self, token: &BearerToken) -> Result<User, ApiError> {
        // Suspend once so concurrent callers interleave like a real request
        tokio::task::yield_now().await;
        let mut state = self.record("current_user");
        state.last_token = Some(token.header_value().to_string());
        state.me.clone()
    }

    async fn authenticate(&self, _email: &str, _password: &str) -> Result<LoginResponse, ApiError> {
        self.record("authenticate").login.clone().map(LoginResponse::new)
    }

    async fn register(&self, _registration: &Registration) -> Result<Option<String>, ApiError> {
        self.record("register").register.clone()
    }
}

#[async_trait]
impl CourseBackend for FakeBackend {
    async fn fetch_course(&self, _id: CourseId) -> Result<Course, ApiError> {
        self.record("fetch_course").course.clone()
    }

    async fn join_course(&self, _id: CourseId) -> Result<Option<String>, ApiError> {
        self.record("join_course").join.clone()
    }

    async fn leave_course(&self, _id: CourseId) -> Result<Option<String>, ApiError> {
        self.record("leave_course").leave.clone()
    }

    async fn rate_course(&self, _id: CourseId, rating: &Rating) -> Result<RatingReceipt, ApiError> {
        let mut state = self.record("rate_course");
        state.last_rating = Some(rating.clone());
        state.rate.clone()
    }
}
