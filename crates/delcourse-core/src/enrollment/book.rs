//! Per-course enrollment state and the join/leave/rate actions.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::{EnrollmentError, EnrollmentState};
use crate::api::{ApiError, CourseBackend, Operation};
use crate::auth::{BearerToken, Session, SessionHandle};
use crate::models::{Course, CourseId, Rating, RatingReceipt};

const JOINED_MESSAGE: &str = "Joined the course.";
const LEFT_MESSAGE: &str = "Left the course.";
const RATED_MESSAGE: &str = "Rating submitted.";

/// Enrollment state for every course the user has looked at, keyed by id.
///
/// Courses are independent: each has its own state channel and busy flag.
/// A book built with [`EnrollmentBook::with_session`] forgets everything when
/// the session's credential changes; subscribers then see a default state and
/// must subscribe again.
pub struct EnrollmentBook<B> {
    backend: Arc<B>,
    courses: Mutex<Courses>,
}

type Slot = Arc<watch::Sender<EnrollmentState>>;

#[derive(Default)]
struct Courses {
    slots: HashMap<CourseId, Slot>,
    session: Option<watch::Receiver<Session>>,
    owner: Option<BearerToken>,
}

impl Courses {
    /// Drop every slot after telling its subscribers. In-flight requests keep
    /// writing to the detached slot they hold.
    fn forget(&mut self) {
        for (_, slot) in self.slots.drain() {
            slot.send_replace(EnrollmentState::default());
        }
    }

    fn follow_session(&mut self) {
        let Some(rx) = self.session.as_mut() else {
            return;
        };
        if !rx.has_changed().unwrap_or(false) {
            return;
        }
        let token = rx.borrow_and_update().token().cloned();
        if token != self.owner {
            debug!(courses = self.slots.len(), "Session changed, forgetting enrollment state");
            self.owner = token;
            self.forget();
        }
    }
}

/// Holds a course's busy flag; releases it on drop, success or failure.
struct BusyGuard {
    state: Slot,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.state.send_modify(EnrollmentState::release);
    }
}

impl<B: CourseBackend> EnrollmentBook<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            courses: Mutex::new(Courses::default()),
        }
    }

    /// A book whose state belongs to the credential currently in `session`.
    pub fn with_session(backend: Arc<B>, session: &SessionHandle) -> Self {
        let mut rx = session.subscribe();
        let owner = rx.borrow_and_update().token().cloned();
        Self {
            backend,
            courses: Mutex::new(Courses {
                session: Some(rx),
                owner,
                ..Courses::default()
            }),
        }
    }

    /// Forget the enrollment state of every course.
    pub fn clear(&self) {
        self.courses.lock().forget();
    }

    fn slot(&self, id: CourseId) -> Slot {
        let mut courses = self.courses.lock();
        courses.follow_session();
        courses
            .slots
            .entry(id)
            .or_insert_with(|| Arc::new(watch::channel(EnrollmentState::default()).0))
            .clone()
    }

    fn acquire(&self, id: CourseId) -> Result<BusyGuard, EnrollmentError> {
        let state = self.slot(id);
        if state.send_if_modified(EnrollmentState::try_acquire) {
            Ok(BusyGuard { state })
        } else {
            debug!(course_id = id, "Request already in flight");
            Err(EnrollmentError::Busy(id))
        }
    }

    pub fn snapshot(&self, id: CourseId) -> EnrollmentState {
        *self.slot(id).borrow()
    }

    pub fn subscribe(&self, id: CourseId) -> watch::Receiver<EnrollmentState> {
        self.slot(id).subscribe()
    }

    pub fn can_rate(&self, id: CourseId) -> bool {
        self.snapshot(id).can_rate()
    }

    /// Fold a fetched course record into the course's state.
    pub fn observe(&self, id: CourseId, course: &Course) -> EnrollmentState {
        let state = self.slot(id);
        state.send_if_modified(|s| {
            let before = *s;
            s.observe(course);
            *s != before
        });
        let current = *state.borrow();
        current
    }

    /// Fetch a course and observe it.
    pub async fn refresh(&self, id: CourseId) -> Result<Course, ApiError> {
        let course = self.backend.fetch_course(id).await?;
        self.observe(id, &course);
        Ok(course)
    }

    async fn refresh_after_mutation(&self, id: CourseId) {
        if let Err(e) = self.refresh(id).await {
            warn!(course_id = id, error = %e, "Refetch after enrollment change failed");
        }
    }

    /// Join optimistically; reverts the local flag if the server refuses.
    ///
    /// Returns the message to show the user.
    pub async fn join(&self, id: CourseId) -> Result<String, EnrollmentError> {
        let guard = self.acquire(id)?;
        guard.state.send_modify(EnrollmentState::begin_join);

        match self.backend.join_course(id).await {
            Ok(message) => {
                guard.state.send_modify(EnrollmentState::confirm_join);
                info!(course_id = id, "Joined course");
                self.refresh_after_mutation(id).await;
                Ok(message.unwrap_or_else(|| JOINED_MESSAGE.to_string()))
            }
            Err(e) => {
                guard.state.send_modify(EnrollmentState::revert_join);
                warn!(course_id = id, error = %e, "Join failed");
                Err(EnrollmentError::Failed {
                    message: e.user_message(Operation::Join),
                    source: e,
                })
            }
        }
    }

    /// Leave the course. The caller confirms with the user beforehand.
    ///
    /// The local flag stays cleared if the request fails.
    pub async fn leave(&self, id: CourseId) -> Result<String, EnrollmentError> {
        let guard = self.acquire(id)?;
        guard.state.send_modify(EnrollmentState::begin_leave);

        match self.backend.leave_course(id).await {
            Ok(message) => {
                info!(course_id = id, "Left course");
                self.refresh_after_mutation(id).await;
                Ok(message.unwrap_or_else(|| LEFT_MESSAGE.to_string()))
            }
            Err(e) => {
                warn!(course_id = id, error = %e, "Leave failed");
                Err(EnrollmentError::Failed {
                    message: e.user_message(Operation::Leave),
                    source: e,
                })
            }
        }
    }

    /// Submit a rating. Blocked without a request when the user has not joined.
    pub async fn rate(
        &self,
        id: CourseId,
        stars: u8,
        comment: Option<&str>,
    ) -> Result<RatingReceipt, EnrollmentError> {
        if !self.can_rate(id) {
            return Err(EnrollmentError::NotJoined);
        }
        let rating = Rating::new(stars, comment).ok_or(EnrollmentError::InvalidRating(stars))?;
        let _guard = self.acquire(id)?;

        match self.backend.rate_course(id, &rating).await {
            Ok(mut receipt) => {
                info!(course_id = id, stars, "Rating submitted");
                self.refresh_after_mutation(id).await;
                receipt.message.get_or_insert_with(|| RATED_MESSAGE.to_string());
                Ok(receipt)
            }
            Err(e) => {
                warn!(course_id = id, error = %e, "Rating failed");
                Err(EnrollmentError::Failed {
                    message: e.user_message(Operation::Rate),
                    source: e,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryCredentialStore;
    use crate::testing::{sample_user, FakeBackend};
    use serde_json::json;

    fn course(value: serde_json::Value) -> Course {
        Course::from_value(value).expect("test course must be an object")
    }

    fn book(backend: &FakeBackend) -> EnrollmentBook<FakeBackend> {
        EnrollmentBook::new(Arc::new(backend.clone()))
    }

    fn signed_in(raw_token: &str) -> SessionHandle {
        let handle = SessionHandle::new(MemoryCredentialStore::new());
        handle.establish(
            BearerToken::new(raw_token).expect("non-empty token"),
            sample_user(),
        );
        handle
    }

    #[tokio::test]
    async fn test_join_success_then_stale_refetch() {
        let backend = FakeBackend::new();
        backend.set_join(Ok(Some("Berhasil bergabung".to_string())));
        // The refetch omits the flag entirely
        backend.set_course(Ok(course(json!({"id": 42, "title": "Rust"}))));
        let book = book(&backend);

        let message = book.join(42).await.expect("join succeeds");
        assert_eq!(message, "Berhasil bergabung");
        let state = book.snapshot(42);
        assert!(state.effective_joined());
        assert!(!state.is_busy());
        assert_eq!(backend.calls("fetch_course"), 1);
    }

    #[tokio::test]
    async fn test_join_then_explicit_false_keeps_local_flag() {
        let backend = FakeBackend::new();
        backend.set_course(Ok(course(json!({"id": 42, "is_joined": false}))));
        let book = book(&backend);

        assert_eq!(book.join(42).await.expect("join succeeds"), JOINED_MESSAGE);
        let state = book.snapshot(42);
        assert_eq!(state.server_joined(), Some(false));
        assert!(state.effective_joined());
    }

    #[tokio::test]
    async fn test_join_failure_reverts() {
        let backend = FakeBackend::new();
        backend.set_join(Err(ApiError::Server {
            status: 500,
            message: Some("Gagal bergabung".to_string()),
        }));
        let book = book(&backend);

        let err = book.join(42).await.expect_err("join fails");
        assert_eq!(err.to_string(), "Gagal bergabung");
        let state = book.snapshot(42);
        assert!(!state.effective_joined());
        assert!(!state.is_busy());
        assert_eq!(backend.calls("fetch_course"), 0);
    }

    #[tokio::test]
    async fn test_join_failure_default_message() {
        let backend = FakeBackend::new();
        backend.set_join(Err(ApiError::Network("offline".to_string())));
        let book = book(&backend);

        let err = book.join(7).await.expect_err("join fails");
        assert_eq!(err.to_string(), "Failed to join the course.");
        assert!(matches!(err.api_error(), Some(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn test_leave_failure_does_not_resurrect_join() {
        let backend = FakeBackend::new();
        backend.set_leave(Err(ApiError::Server { status: 500, message: None }));
        let book = book(&backend);
        book.observe(5, &course(json!({"id": 5, "my_status_student": true})));
        assert!(book.snapshot(5).effective_joined());

        let err = book.leave(5).await.expect_err("leave fails");
        assert_eq!(err.to_string(), "Failed to leave the course.");
        assert!(!book.snapshot(5).effective_joined());
        assert!(!book.snapshot(5).is_busy());
    }

    #[tokio::test]
    async fn test_leave_success_refetches() {
        let backend = FakeBackend::new();
        backend.set_course(Ok(course(json!({"id": 5, "my_status_student": false}))));
        let book = book(&backend);
        book.observe(5, &course(json!({"id": 5, "my_status_student": true})));

        assert_eq!(book.leave(5).await.expect("leave succeeds"), LEFT_MESSAGE);
        assert!(!book.snapshot(5).effective_joined());
        assert_eq!(backend.calls("fetch_course"), 1);
    }

    #[tokio::test]
    async fn test_busy_guard_blocks_overlapping_requests() {
        let backend = FakeBackend::new();
        let book = book(&backend);

        let guard = book.acquire(42).expect("first acquire");
        assert!(book.snapshot(42).is_busy());
        assert!(matches!(book.join(42).await, Err(EnrollmentError::Busy(42))));
        assert!(matches!(book.leave(42).await, Err(EnrollmentError::Busy(42))));
        assert_eq!(backend.calls("join_course"), 0);
        assert_eq!(backend.calls("leave_course"), 0);
        assert!(!book.snapshot(42).effective_joined());

        // Other courses are unaffected
        assert!(book.join(43).await.is_ok());

        drop(guard);
        assert!(!book.snapshot(42).is_busy());
        assert!(book.join(42).await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_blocked_when_not_joined() {
        let backend = FakeBackend::new();
        let book = book(&backend);

        let err = book.rate(42, 5, None).await.expect_err("not joined");
        assert!(matches!(err, EnrollmentError::NotJoined));
        assert_eq!(backend.calls("rate_course"), 0);
    }

    #[tokio::test]
    async fn test_rate_rejects_out_of_range() {
        let backend = FakeBackend::new();
        let book = book(&backend);
        book.observe(42, &course(json!({"joined": true})));

        assert!(matches!(
            book.rate(42, 6, None).await,
            Err(EnrollmentError::InvalidRating(6))
        ));
        assert_eq!(backend.calls("rate_course"), 0);
    }

    #[tokio::test]
    async fn test_rate_success() {
        let backend = FakeBackend::new();
        backend.set_rate(Ok(RatingReceipt {
            message: None,
            average_rating: Some(4.5),
        }));
        let book = book(&backend);
        book.observe(42, &course(json!({"joined": 1})));

        let receipt = book.rate(42, 4, Some("mantap")).await.expect("rate succeeds");
        assert_eq!(receipt.message.as_deref(), Some(RATED_MESSAGE));
        assert_eq!(receipt.average_rating, Some(4.5));
        assert_eq!(backend.last_rating().map(|r| r.stars()), Some(4));
    }

    #[tokio::test]
    async fn test_rate_forbidden_messages() {
        let backend = FakeBackend::new();
        backend.set_rate(Err(ApiError::Server { status: 403, message: None }));
        let book = book(&backend);
        book.observe(42, &course(json!({"joined": true})));

        let err = book.rate(42, 5, None).await.expect_err("forbidden");
        assert_eq!(
            err.to_string(),
            "Not allowed to rate: make sure you have joined this course."
        );

        backend.set_rate(Err(ApiError::Server {
            status: 403,
            message: Some("Belum menjadi peserta".to_string()),
        }));
        let err = book.rate(42, 5, None).await.expect_err("forbidden");
        assert_eq!(err.to_string(), "Belum menjadi peserta");
    }

    #[tokio::test]
    async fn test_observe_empty_record_keeps_state() {
        let backend = FakeBackend::new();
        let book = book(&backend);
        book.observe(1, &course(json!({"my_status_join": true})));
        let state = book.observe(1, &course(json!({})));
        assert_eq!(state.server_joined(), Some(true));
    }

    #[tokio::test]
    async fn test_subscribe_sees_changes() {
        let backend = FakeBackend::new();
        let book = book(&backend);
        let mut rx = book.subscribe(9);

        book.observe(9, &course(json!({"joined": true})));
        assert!(rx.has_changed().expect("sender alive"));
        assert!(rx.borrow_and_update().effective_joined());

        // Absent flag: no change is published
        book.observe(9, &course(json!({})));
        assert!(!rx.has_changed().expect("sender alive"));
    }

    #[tokio::test]
    async fn test_refresh_failure_is_returned() {
        let backend = FakeBackend::new();
        backend.set_course(Err(ApiError::Server { status: 404, message: None }));
        let book = book(&backend);
        assert!(book.refresh(3).await.is_err());
        assert_eq!(book.snapshot(3), EnrollmentState::default());
    }

    #[tokio::test]
    async fn test_logout_forgets_joined_courses() {
        let backend = FakeBackend::new();
        let handle = signed_in("first");
        let book = EnrollmentBook::with_session(Arc::new(backend.clone()), &handle);

        book.join(42).await.expect("join succeeds");
        assert!(book.can_rate(42));

        handle.reset();
        assert!(!book.can_rate(42));
        assert_eq!(book.snapshot(42), EnrollmentState::default());
    }

    #[tokio::test]
    async fn test_switching_accounts_forgets_joined_courses() {
        let backend = FakeBackend::new();
        let handle = signed_in("first");
        let book = EnrollmentBook::with_session(Arc::new(backend.clone()), &handle);
        book.observe(42, &course(json!({"joined": true})));
        let mut rx = book.subscribe(42);

        // Same credential re-established: nothing to forget
        handle.establish(BearerToken::new("first").expect("non-empty token"), sample_user());
        assert!(book.can_rate(42));

        handle.establish(BearerToken::new("second").expect("non-empty token"), sample_user());
        assert!(!book.can_rate(42));
        assert!(rx.has_changed().expect("sender alive"));
        assert!(!rx.borrow_and_update().effective_joined());
    }

    #[tokio::test]
    async fn test_clear_forgets_state() {
        let backend = FakeBackend::new();
        let book = book(&backend);
        book.observe(7, &course(json!({"is_joined": true})));
        assert!(book.can_rate(7));

        book.clear();
        assert!(!book.can_rate(7));
        assert_eq!(book.snapshot(7).server_joined(), None);
    }
}
