use chrono::{DateTime, Utc};
use itertools::Itertools;
use rusqlite::Connection;

use crate::{db::DBResult, models::{Lap, NewSession, Session}};

/////*============== SESSION QUERIES ==============*/
/// Reads a session row. Laps live in their own table and are attached afterwards.
impl<'a> TryFrom<&'a rusqlite::Row<'a>> for Session {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        let created_at_ms: i64 = row.get("created_at")?;
        let created_at = DateTime::from_timestamp_millis(created_at_ms).ok_or_else(|| {
            rusqlite::Error::IntegralValueOutOfRange(0, created_at_ms)
        })?;

        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,

            problem_rating: row.get("problem_rating")?,
            total_time: row.get("total_time")?,
            laps: Vec::new(),
            comments: row.get("comments")?,

            score: row.get("score")?,
            streak_bonus: row.get("streak_bonus")?,

            created_at,
        })
    }
}

impl<'a> TryFrom<&'a rusqlite::Row<'a>> for Lap {
    type Error = rusqlite::Error;

    fn try_from(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            name: row.get("name")?,
            duration_seconds: row.get("duration_seconds")?,
            comment: row.get("comment")?,
        })
    }
}

/// Inserts a session and its laps. Returns the stored session.
///
/// Callers wanting atomicity with other writes should pass a transaction.
pub fn insert_session(connection: &Connection, session: NewSession) -> DBResult<Session> {
    log::trace!("[insert_session] Inserting session for {} into Sessions...", session.username);

    let created_at_ms = session.created_at.timestamp_millis();
    let query_params = rusqlite::named_params! {
            ":username":       session.username,
            ":problem_rating": session.problem_rating,
            ":total_time":     session.total_time,
            ":comments":       session.comments,
            ":score":          session.score,
            ":streak_bonus":   session.streak_bonus,
            ":created_at":     created_at_ms,
    };

    connection
        .prepare(
            "INSERT INTO Sessions
                ( username,  problem_rating,  total_time,  comments,  score,  streak_bonus,  created_at)
            VALUES
                (:username, :problem_rating, :total_time, :comments, :score, :streak_bonus, :created_at)"
        )?
        .execute(query_params)?;

    let id = connection.last_insert_rowid();

    let mut lap_stmt = connection.prepare(
        "INSERT INTO Laps ( session_id,  position,  name,  duration_seconds,  comment)
         VALUES           (:session_id, :position, :name, :duration_seconds, :comment)"
    )?;
    for (position, lap) in session.laps.iter().enumerate() {
        lap_stmt.execute(rusqlite::named_params! {
            ":session_id":       id,
            ":position":         position,
            ":name":             lap.name,
            ":duration_seconds": lap.duration_seconds,
            ":comment":          lap.comment,
        })?;
    }

    // Reads come back at millisecond precision, so the returned copy should too.
    let created_at = DateTime::from_timestamp_millis(created_at_ms)
        .unwrap_or(session.created_at);

    Ok(Session::from_new(id, NewSession { created_at, ..session }))
}

/// A user's most recent sessions, newest first.
pub fn query_sessions_for_user(
    connection: &Connection,
    username: &str,
    limit: usize,
) -> DBResult<Vec<Session>> {
    log::trace!("[query_sessions_for_user] Querying up to {limit} sessions for {username}...");

    let query_params = rusqlite::named_params! {
            ":username": username,
            ":limit":    limit,
    };

    let mut stmt = connection.prepare(
        "SELECT * FROM Sessions
         WHERE username = :username
         ORDER BY created_at DESC, id DESC
         LIMIT :limit",
    )?;
    let sessions = stmt
        .query_map(query_params, |row| Session::try_from(row))?
        .collect::<DBResult<Vec<Session>>>()?;

    attach_laps(connection, sessions)
}

/// Every session created at or after `cutoff` (all of them without one), oldest first.
/// Laps are left empty.
pub fn query_sessions_since(
    connection: &Connection,
    cutoff: Option<DateTime<Utc>>,
) -> DBResult<Vec<Session>> {
    log::trace!("[query_sessions_since] Querying sessions since {cutoff:?}...");

    let cutoff_ms = cutoff.map_or(i64::MIN, |c| c.timestamp_millis());
    let query_params = rusqlite::named_params! { ":cutoff": cutoff_ms };

    let mut stmt = connection.prepare(
        "SELECT * FROM Sessions
         WHERE created_at >= :cutoff
         ORDER BY created_at, id",
    )?;
    stmt.query_map(query_params, |row| Session::try_from(row))?
        .collect::<DBResult<Vec<Session>>>()
}

/// [internal] Fills in the laps for a batch of sessions with a single query.
fn attach_laps(connection: &Connection, mut sessions: Vec<Session>) -> DBResult<Vec<Session>> {
    if sessions.is_empty() {
        return Ok(sessions);
    }

    let ids = sessions.iter().map(|s| s.id.to_string()).join(",");
    let mut stmt = connection.prepare(&format!(
        "SELECT * FROM Laps WHERE session_id IN ({ids}) ORDER BY session_id, position"
    ))?;

    let mut laps = stmt
        .query_map([], |row| Ok((row.get::<_, i64>("session_id")?, Lap::try_from(row)?)))?
        .collect::<DBResult<Vec<(i64, Lap)>>>()?
        .into_iter()
        .into_group_map();

    for session in &mut sessions {
        session.laps = laps.remove(&session.id).unwrap_or_default();
    }

    Ok(sessions)
}
