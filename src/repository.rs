use chrono::{DateTime, Utc};

use crate::error::EngineResult;
use crate::models::{NewSession, Session, UserAggregate};

/// Storage the engine reads users and sessions from.
///
/// Implementations must make [`Repository::commit_session`] all-or-nothing: either the
/// session is stored *and* the aggregate moves to `next`, or nothing changes.
pub trait Repository {
    fn find_user(&self, username: &str) -> EngineResult<Option<UserAggregate>>;

    /// Stores a new user. Returns `false` if the username was already taken.
    fn insert_user(&self, user: &UserAggregate) -> EngineResult<bool>;

    fn all_users(&self) -> EngineResult<Vec<UserAggregate>>;

    /// A user's most recent sessions, newest first.
    fn sessions_for_user(&self, username: &str, limit: usize) -> EngineResult<Vec<Session>>;

    /// Every session created at or after `cutoff`, or every session if there is none.
    /// Laps are not loaded; rankings only need the points.
    fn sessions_since(&self, cutoff: Option<DateTime<Utc>>) -> EngineResult<Vec<Session>>;

    /// Writes `session` and replaces the user's aggregate with `next`, provided the stored
    /// aggregate is still at `expected_version`. A stale version fails with
    /// [`EngineError::Persistence`](crate::error::EngineError::Persistence) and writes nothing.
    fn commit_session(
        &mut self,
        session: NewSession,
        next: &UserAggregate,
        expected_version: u64,
    ) -> EngineResult<Session>;
}
