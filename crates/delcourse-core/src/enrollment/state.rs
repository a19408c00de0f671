//! Reconciliation policy for one course's "joined" flag.

use crate::models::Course;

/// Enrollment of the current user in one course.
///
/// `local_joined` is the optimistic flag set by this client; `server_joined`
/// is the last explicit value the server reported (`None` until the server
/// says anything). The user sees `effective_joined`, the OR of both.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrollmentState {
    local_joined: bool,
    server_joined: Option<bool>,
    busy: bool,
}

impl EnrollmentState {
    pub fn local_joined(&self) -> bool {
        self.local_joined
    }

    pub fn server_joined(&self) -> Option<bool> {
        self.server_joined
    }

    pub fn effective_joined(&self) -> bool {
        self.local_joined || self.server_joined == Some(true)
    }

    /// Whether a join/leave/rate request is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Client-side rating gate. The server enforces the real rule.
    pub fn can_rate(&self) -> bool {
        self.effective_joined()
    }

    /// Fold a freshly fetched course record in.
    pub fn observe(&mut self, course: &Course) {
        self.observe_signal(course.joined_signal());
    }

    /// An absent signal carries no information and leaves the state alone.
    pub fn observe_signal(&mut self, signal: Option<bool>) {
        if let Some(joined) = signal {
            self.server_joined = Some(joined);
        }
    }

    pub(crate) fn begin_join(&mut self) {
        self.local_joined = true;
    }

    pub(crate) fn confirm_join(&mut self) {
        self.server_joined = Some(true);
    }

    pub(crate) fn revert_join(&mut self) {
        self.local_joined = false;
    }

    /// Leaving clears both flags up front; a failed leave does not bring
    /// "joined" back until the server says so on a later refetch.
    pub(crate) fn begin_leave(&mut self) {
        self.local_joined = false;
        self.server_joined = Some(false);
    }

    /// Claim the busy flag; false if it was already held.
    pub(crate) fn try_acquire(&mut self) -> bool {
        if self.busy {
            false
        } else {
            self.busy = true;
            true
        }
    }

    pub(crate) fn release(&mut self) {
        self.busy = false;
    }
}
