use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::input::SessionInput;
use crate::models::{NewSession, ScoreBreakdown, Session, UserAggregate};
use crate::ranking::{self, RankedUser, SortBy, TimeRange};
use crate::repository::Repository;
use crate::{scoring, streak};

/// What a caller gets back after logging a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOutcome {
    pub session: Session,
    pub breakdown: ScoreBreakdown,
    pub user: UserAggregate,
    /// All-time position by total score, right after this session.
    pub rank: usize,
}

/// A user's aggregate together with their all-time rank by total score.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserAggregate,
    pub rank: usize,
}

/// Creates an empty aggregate for `username`.
/// Returns `false` if they were already registered.
pub fn register_user(repo: &impl Repository, username: &str) -> EngineResult<bool> {
    if username.trim().is_empty() {
        return Err(EngineError::Validation(String::from("username must not be empty")));
    }

    let created = repo.insert_user(&UserAggregate::new(username))?;
    if created {
        log::info!("User {username} has been registered.");
    }

    Ok(created)
}

/// Parses a raw submission body and logs it for `username`.
pub fn submit_json<R: Repository>(
    repo: &mut R,
    config: &EngineConfig,
    username: &str,
    body: &serde_json::Value,
    now: DateTime<Utc>,
) -> EngineResult<SessionOutcome> {
    let input = SessionInput::from_json(body, config.input_policy)?;
    submit_session(repo, config, username, input, now)
}

/// Scores a practice session, stores it, and folds it into the user's aggregate.
///
/// The session write and the aggregate update commit together or not at all. If the
/// aggregate moved between our read and our write, nothing is stored and the caller
/// gets a persistence error to resubmit on.
pub fn submit_session<R: Repository>(
    repo: &mut R,
    config: &EngineConfig,
    username: &str,
    input: SessionInput,
    now: DateTime<Utc>,
) -> EngineResult<SessionOutcome> {
    let user = repo
        .find_user(username)?
        .ok_or_else(|| EngineError::NotFound(format!("user {username}")))?;

    if input.problem_rating > config.scoring.max_rating {
        return Err(EngineError::Validation(format!(
            "problemRating must be at most {}, got {}",
            config.scoring.max_rating, input.problem_rating
        )));
    }

    let today = now.date_naive();
    let solve = scoring::score_solve(&config.scoring, input.problem_rating, input.total_time);
    let streak = streak::advance(
        &config.streak,
        user.current_streak,
        user.max_streak,
        user.last_qualifying_date,
        today,
    );

    let breakdown = ScoreBreakdown {
        base_score: solve.base_score,
        time_bonus: solve.time_bonus,
        streak_bonus: streak.streak_bonus,
        total_score: solve.score.saturating_add(streak.streak_bonus),
    };

    let next = user.apply(breakdown.total_score, &streak, today, &config.leagues);

    // Everyone else as they are now, with this user swapped for their new aggregate.
    let standings = repo
        .all_users()?
        .into_iter()
        .map(|other| if other.username == next.username { next.clone() } else { other })
        .collect();

    let new_session = NewSession {
        username: user.username.clone(),
        problem_rating: input.problem_rating,
        total_time: input.total_time,
        laps: input.laps,
        comments: input.comments,
        score: solve.score,
        streak_bonus: streak.streak_bonus,
        created_at: now,
    };

    let session = repo.commit_session(new_session, &next, user.version)?;

    let board = ranking::rank_users(standings, &[], SortBy::TotalScore, TimeRange::All, now);
    let rank = ranking::rank_of(&board, username).unwrap_or(board.len());

    log::info!(
        "[submit_session] {username} logged session #{}: +{} ({} total, streak {}, {}, rank {rank})",
        session.id, breakdown.total_score, next.total_score, next.current_streak, next.league
    );

    Ok(SessionOutcome { session, breakdown, user: next, rank })
}

/// Builds a leaderboard from current aggregates and session history.
pub fn leaderboard(
    repo: &impl Repository,
    sort_by: SortBy,
    time_range: TimeRange,
    now: DateTime<Utc>,
    limit: Option<usize>,
) -> EngineResult<Vec<RankedUser>> {
    let users = repo.all_users()?;

    // Bounded windows need the history; all-time boards don't.
    let sessions = match time_range.cutoff(now) {
        Some(cutoff) => repo.sessions_since(Some(cutoff))?,
        None => Vec::new(),
    };

    let mut board = ranking::rank_users(users, &sessions, sort_by, time_range, now);
    if let Some(limit) = limit {
        board.truncate(limit);
    }

    Ok(board)
}

/// Looks up a user and where they stand all-time.
pub fn profile(repo: &impl Repository, username: &str, now: DateTime<Utc>) -> EngineResult<Profile> {
    let board = leaderboard(repo, SortBy::TotalScore, TimeRange::All, now, None)?;

    board
        .into_iter()
        .find(|entry| entry.user.username == username)
        .map(|entry| Profile { rank: entry.rank, user: entry.user })
        .ok_or_else(|| EngineError::NotFound(format!("user {username}")))
}

/// A user's most recent sessions, newest first.
pub fn history(repo: &impl Repository, username: &str, limit: usize) -> EngineResult<Vec<Session>> {
    if repo.find_user(username)?.is_none() {
        return Err(EngineError::NotFound(format!("user {username}")));
    }

    repo.sessions_for_user(username, limit)
}
