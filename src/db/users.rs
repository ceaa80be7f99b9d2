use rusqlite::Connection;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::{db::DBResult, league::League, models::UserAggregate};

/////*============== USER QUERIES ==============*/
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for UserAggregate {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            username: row.get("username")?,
            total_score: row.get("total_score")?,
            total_sessions: row.get("total_sessions")?,
            current_streak: row.get("current_streak")?,
            max_streak: row.get("max_streak")?,
            last_qualifying_date: row.get("last_qualifying_date")?,
            league: row.get("league")?,
            version: row.get("version")?,
        })
    }
}

impl ToSql for League {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for League {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|err: String| FromSqlError::Other(err.into()))
    }
}

/// Returns the user with the username: `username`, if they exist.
pub fn query_user(connection: &Connection, username: &str) -> DBResult<Option<UserAggregate>> {
    log::trace!("[query_user] Querying user {username}...");

    connection
        .prepare("SELECT * FROM Users WHERE username = :username")?
        .query(rusqlite::named_params! { ":username": username })?
        .next()?
        .map(|row| row.try_into())
        .transpose()
}

/// Gathers every user, in registration order.
pub fn query_all_users(connection: &Connection) -> DBResult<Vec<UserAggregate>> {
    log::trace!("[query_all_users] Querying all users.");

    let mut stmt = connection.prepare("SELECT * FROM Users ORDER BY rowid")?;
    let users = stmt
        .query_map([], |row| UserAggregate::try_from(row))?
        .collect::<DBResult<Vec<UserAggregate>>>()?;

    Ok(users)
}

/// Inserts a user, doing nothing if they're already there.
/// Returns `true` if it was newly added, false otherwise.
pub fn insert_user(connection: &Connection, user: &UserAggregate) -> DBResult<bool> {
    log::trace!("[insert_user] Inserting user {} into Users...", user.username);

    let query_params = rusqlite::named_params! {
            ":username":             user.username,
            ":total_score":          user.total_score,
            ":total_sessions":       user.total_sessions,
            ":current_streak":       user.current_streak,
            ":max_streak":           user.max_streak,
            ":last_qualifying_date": user.last_qualifying_date,
            ":league":               user.league,
            ":version":              user.version,
    };

    connection
        .prepare(
            "INSERT INTO Users ( username,  total_score,  total_sessions,  current_streak,
                                 max_streak,  last_qualifying_date,  league,  version)
             VALUES            (:username, :total_score, :total_sessions, :current_streak,
                                :max_streak, :last_qualifying_date, :league, :version)"
        )?
        .execute(query_params)
        .map_or_else(crate::db::swallow_constraint_violation, |_| Ok(true))
}

/// Overwrites a user's aggregate with `next`, but only if the stored row is still at
/// `expected_version`.
///
/// Returns `false` if someone else got there first.
pub fn compare_and_swap_user(
    connection: &Connection,
    next: &UserAggregate,
    expected_version: u64,
) -> DBResult<bool> {
    log::trace!("[compare_and_swap_user] Updating {} from version {expected_version}...",
                next.username);

    let query_params = rusqlite::named_params! {
            ":username":             next.username,
            ":total_score":          next.total_score,
            ":total_sessions":       next.total_sessions,
            ":current_streak":       next.current_streak,
            ":max_streak":           next.max_streak,
            ":last_qualifying_date": next.last_qualifying_date,
            ":league":               next.league,
            ":version":              next.version,
            ":expected_version":     expected_version,
    };

    let changed = connection
        .prepare(
            "UPDATE Users SET
                total_score = :total_score,
                total_sessions = :total_sessions,
                current_streak = :current_streak,
                max_streak = :max_streak,
                last_qualifying_date = :last_qualifying_date,
                league = :league,
                version = :version
             WHERE username = :username AND version = :expected_version"
        )?
        .execute(query_params)?;

    Ok(changed == 1)
}
