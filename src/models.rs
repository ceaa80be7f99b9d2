use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LeagueThresholds;
use crate::league::League;
use crate::streak::StreakUpdate;

/// A user's running totals. Everything but `username` is derived from their sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAggregate {
    pub username: String,

    pub total_score: u64,
    pub total_sessions: u64,

    pub current_streak: u64,
    pub max_streak: u64,
    pub last_qualifying_date: Option<NaiveDate>,

    pub league: League,

    /// Bumped on every write; stale writers lose.
    pub version: u64,
}

impl UserAggregate {
    /// A freshly registered user with no sessions.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            total_score: 0,
            total_sessions: 0,
            current_streak: 0,
            max_streak: 0,
            last_qualifying_date: None,
            league: League::Beginner,
            version: 0,
        }
    }

    /// The aggregate after logging one more session on `today` worth `award` points.
    ///
    /// This is the only way an aggregate changes. The result carries the next `version`,
    /// so storing it against the old version succeeds at most once.
    pub fn apply(
        &self,
        award: u64,
        streak: &StreakUpdate,
        today: NaiveDate,
        thresholds: &LeagueThresholds,
    ) -> UserAggregate {
        let total_score = self.total_score.saturating_add(award);

        UserAggregate {
            username: self.username.clone(),
            total_score,
            total_sessions: self.total_sessions + 1,
            current_streak: streak.current_streak,
            max_streak: self.max_streak.max(streak.max_streak),
            last_qualifying_date: Some(today),
            league: League::classify(thresholds, total_score),
            version: self.version + 1,
        }
    }

    /// Mean award per session, or 0 for a user who hasn't logged anything.
    pub fn average_score(&self) -> f64 {
        if self.total_sessions == 0 {
            0.0
        } else {
            self.total_score as f64 / self.total_sessions as f64
        }
    }
}

impl std::fmt::Display for UserAggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**{}** ({})\n\
             \tTotal Score: {}\n\
             \tSessions: {}\n\
             \tAverage Score: {:.1}\n\
             \tCurrent Streak: {}\n\
             \tBest Streak: {}",
            self.username, self.league,
            self.total_score, self.total_sessions, self.average_score(),
            self.current_streak, self.max_streak
        )
    }
}

/// One timed sub-interval of a practice session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub name: String,
    pub duration_seconds: f64,
    pub comment: Option<String>,
}

/// A session that has been scored but not yet written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSession {
    pub username: String,

    pub problem_rating: f64,
    pub total_time: f64,
    pub laps: Vec<Lap>,
    pub comments: Option<String>,

    /// Base score plus time bonus.
    pub score: u64,
    pub streak_bonus: u64,

    pub created_at: DateTime<Utc>,
}

/// A stored practice session. Never modified after it is written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: i64,
    pub username: String,

    pub problem_rating: f64,
    pub total_time: f64,
    pub laps: Vec<Lap>,
    pub comments: Option<String>,

    /// Base score plus time bonus.
    pub score: u64,
    pub streak_bonus: u64,

    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Everything this session added to the user's total score.
    pub fn total_points(&self) -> u64 {
        self.score.saturating_add(self.streak_bonus)
    }

    pub fn from_new(id: i64, new: NewSession) -> Self {
        Self {
            id,
            username: new.username,
            problem_rating: new.problem_rating,
            total_time: new.total_time,
            laps: new.laps,
            comments: new.comments,
            score: new.score,
            streak_bonus: new.streak_bonus,
            created_at: new.created_at,
        }
    }
}

impl std::fmt::Display for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "**Session #{}**: rating {}, {}\n\
             \tScore: {} (+{} streak)\n\
             \tLaps: {}\n\
             \tLogged: {}",
            self.id, self.problem_rating, format_duration(self.total_time),
            self.score, self.streak_bonus,
            self.laps.len(),
            self.created_at.format("%Y-%m-%d %H:%M UTC")
        )
    }
}

/// How a session's points were put together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub base_score: u64,
    pub time_bonus: u64,
    pub streak_bonus: u64,
    pub total_score: u64,
}

impl std::fmt::Display for ScoreBreakdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Base: {}\n\
             Time Bonus: +{}\n\
             Streak Bonus: +{}\n\
             **Total: {}**",
            self.base_score, self.time_bonus, self.streak_bonus, self.total_score
        )
    }
}

pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0).round() as u64;
    format!("{}m{:02}s", seconds / 60, seconds % 60)
}
