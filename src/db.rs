use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::error::{EngineError, EngineResult};
use crate::models::{NewSession, Session, UserAggregate};
use crate::repository::Repository;

pub mod schema;
pub mod sessions;
pub mod users;

pub type DBResult<T> = Result<T, rusqlite::Error>;

/// SQLite-backed storage for users and their sessions.
pub struct SqliteRepository {
    connection: Connection,
}

impl SqliteRepository {
    /// Opens (or creates) the database file at `path` and makes sure the tables exist.
    pub fn open(path: impl AsRef<Path>) -> EngineResult<Self> {
        let repository = Self { connection: Connection::open(path)? };
        repository.initialize()?;
        Ok(repository)
    }

    /// A throwaway database, mostly for tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        let repository = Self { connection: Connection::open_in_memory()? };
        repository.initialize()?;
        Ok(repository)
    }

    fn initialize(&self) -> DBResult<()> {
        self.connection.pragma_update(None, "foreign_keys", true)?;

        log::debug!("[initialize] creating Users table...");
        self.connection.execute(schema::USERS_SCHEMA, [])?;

        log::debug!("[initialize] creating Sessions table...");
        self.connection.execute(schema::SESSIONS_SCHEMA, [])?;
        self.connection.execute(schema::SESSIONS_INDEX, [])?;

        log::debug!("[initialize] creating Laps table...");
        self.connection.execute(schema::LAPS_SCHEMA, [])?;

        Ok(())
    }
}

impl Repository for SqliteRepository {
    fn find_user(&self, username: &str) -> EngineResult<Option<UserAggregate>> {
        Ok(users::query_user(&self.connection, username)?)
    }

    fn insert_user(&self, user: &UserAggregate) -> EngineResult<bool> {
        Ok(users::insert_user(&self.connection, user)?)
    }

    fn all_users(&self) -> EngineResult<Vec<UserAggregate>> {
        Ok(users::query_all_users(&self.connection)?)
    }

    fn sessions_for_user(&self, username: &str, limit: usize) -> EngineResult<Vec<Session>> {
        Ok(sessions::query_sessions_for_user(&self.connection, username, limit)?)
    }

    fn sessions_since(&self, cutoff: Option<DateTime<Utc>>) -> EngineResult<Vec<Session>> {
        Ok(sessions::query_sessions_since(&self.connection, cutoff)?)
    }

    fn commit_session(
        &mut self,
        session: NewSession,
        next: &UserAggregate,
        expected_version: u64,
    ) -> EngineResult<Session> {
        // IMMEDIATE takes the write lock up front, so two submissions can't interleave.
        let tx = self.connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if !users::compare_and_swap_user(&tx, next, expected_version)? {
            log::error!("[commit_session] {} changed since version {expected_version}, \
                         discarding session.", next.username);
            return Err(EngineError::Persistence(format!(
                "{} was updated concurrently, please resubmit",
                next.username
            )));
        }

        let stored = sessions::insert_session(&tx, session)?;
        tx.commit()?;

        Ok(stored)
    }
}

/// Turns a uniqueness violation into `Ok(false)` ("nothing new was added").
pub fn swallow_constraint_violation(err: rusqlite::Error) -> DBResult<bool> {
    match err {
        rusqlite::Error::SqliteFailure(ffi_err, _)
            if ffi_err.code == rusqlite::ErrorCode::ConstraintViolation => Ok(false),
        err => Err(err),
    }
}
