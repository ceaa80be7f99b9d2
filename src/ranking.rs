use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::Serialize;

use crate::models::{Session, UserAggregate};

/// What the leaderboard is ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    #[default]
    TotalScore,
    CurrentStreak,
    MaxStreak,
    AverageScore,
    TotalSessions,
}

/// Which sessions count towards the metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TimeRange {
    #[default]
    All,
    Month,
    Week,
}

impl SortBy {
    /// Parses a client-supplied criterion. Anything unrecognised sorts by total score.
    pub fn parse_lenient(raw: Option<&str>) -> SortBy {
        let Some(raw) = raw else { return SortBy::default() };
        match raw.to_lowercase().as_str() {
            "totalscore" | "score" => SortBy::TotalScore,
            "currentstreak" | "streak" => SortBy::CurrentStreak,
            "maxstreak" | "best" => SortBy::MaxStreak,
            "averagescore" | "average" => SortBy::AverageScore,
            "totalsessions" | "sessions" => SortBy::TotalSessions,
            _ => {
                log::warn!("[parse_lenient] Unknown sortBy '{raw}', sorting by total score.");
                SortBy::TotalScore
            }
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortBy::TotalScore => "Total Score",
            SortBy::CurrentStreak => "Current Streak",
            SortBy::MaxStreak => "Best Streak",
            SortBy::AverageScore => "Average Score",
            SortBy::TotalSessions => "Sessions",
        }
    }
}

impl TimeRange {
    /// Parses a client-supplied window. Anything unrecognised means all time.
    pub fn parse_lenient(raw: Option<&str>) -> TimeRange {
        let Some(raw) = raw else { return TimeRange::default() };
        match raw.to_lowercase().as_str() {
            "all" => TimeRange::All,
            "month" => TimeRange::Month,
            "week" => TimeRange::Week,
            _ => {
                log::warn!("[parse_lenient] Unknown timeRange '{raw}', using all time.");
                TimeRange::All
            }
        }
    }

    /// Oldest session timestamp still inside the window, if the window is bounded.
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::All => None,
            TimeRange::Month => Some(now - Duration::days(30)),
            TimeRange::Week => Some(now - Duration::days(7)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeRange::All => "All Time",
            TimeRange::Month => "Last 30 Days",
            TimeRange::Week => "Last 7 Days",
        }
    }
}

/// The value a board is sorted by. Counts compare exactly; only averages are floating.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Metric {
    Count(u64),
    Mean(f64),
}

impl Metric {
    pub fn as_f64(self) -> f64 {
        match self {
            Metric::Count(n) => n as f64,
            Metric::Mean(x) => x,
        }
    }

    fn compare(&self, other: &Metric) -> Ordering {
        match (self, other) {
            (Metric::Count(a), Metric::Count(b)) => a.cmp(b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Count(n) => write!(f, "{n}"),
            Metric::Mean(x) => write!(f, "{x:.1}"),
        }
    }
}

/// One row of a leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedUser {
    /// 1-based position. Ties are not shared.
    pub rank: usize,
    /// The value the board was sorted by.
    pub metric: Metric,
    #[serde(flatten)]
    pub user: UserAggregate,
}

/// Sums over a bounded window of one user's sessions.
#[derive(Debug, Default, Clone, Copy)]
struct WindowTotals {
    points: u64,
    sessions: u64,
}

impl WindowTotals {
    fn average(self) -> f64 {
        if self.sessions == 0 { 0.0 } else { self.points as f64 / self.sessions as f64 }
    }
}

/// Orders users by `sort_by`, highest first, and numbers them from 1.
///
/// For bounded windows the score and session metrics are recomputed from `sessions`
/// (anything outside the window is ignored), streaks are always read from the aggregate.
/// The sort is stable, so tied users keep their input order.
pub fn rank_users(
    users: Vec<UserAggregate>,
    sessions: &[Session],
    sort_by: SortBy,
    time_range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<RankedUser> {
    let windowed = time_range.cutoff(now).map(|cutoff| {
        sessions
            .iter()
            .filter(|s| s.created_at >= cutoff && s.created_at <= now)
            .into_group_map_by(|s| s.username.clone())
            .into_iter()
            .map(|(username, sessions)| {
                let totals = WindowTotals {
                    points: sessions.iter().fold(0u64, |sum, s| sum.saturating_add(s.total_points())),
                    sessions: sessions.len() as u64,
                };
                (username, totals)
            })
            .collect::<HashMap<String, WindowTotals>>()
    });

    let metric = |user: &UserAggregate| -> Metric {
        let totals = windowed
            .as_ref()
            .map(|w| w.get(&user.username).copied().unwrap_or_default());

        match (sort_by, totals) {
            (SortBy::CurrentStreak, _) => Metric::Count(user.current_streak),
            (SortBy::MaxStreak, _) => Metric::Count(user.max_streak),
            (SortBy::TotalScore, None) => Metric::Count(user.total_score),
            (SortBy::TotalScore, Some(t)) => Metric::Count(t.points),
            (SortBy::TotalSessions, None) => Metric::Count(user.total_sessions),
            (SortBy::TotalSessions, Some(t)) => Metric::Count(t.sessions),
            (SortBy::AverageScore, None) => Metric::Mean(user.average_score()),
            (SortBy::AverageScore, Some(t)) => Metric::Mean(t.average()),
        }
    };

    users
        .into_iter()
        .map(|user| (metric(&user), user))
        .sorted_by(|(a, _), (b, _)| b.compare(a))
        .enumerate()
        .map(|(index, (metric, user))| RankedUser { rank: index + 1, metric, user })
        .collect()
}

/// Where `username` sits on an already-ranked board.
pub fn rank_of(ranking: &[RankedUser], username: &str) -> Option<usize> {
    ranking
        .iter()
        .find(|entry| entry.user.username == username)
        .map(|entry| entry.rank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap()
    }

    fn user(name: &str, total_score: u64, total_sessions: u64) -> UserAggregate {
        UserAggregate { total_score, total_sessions, ..UserAggregate::new(name) }
    }

    fn session(id: i64, name: &str, score: u64, days_ago: i64) -> Session {
        Session {
            id,
            username: name.to_string(),
            problem_rating: 1000.0,
            total_time: 600.0,
            laps: Vec::new(),
            comments: None,
            score,
            streak_bonus: 0,
            created_at: now() - Duration::days(days_ago),
        }
    }

    fn names(ranking: &[RankedUser]) -> Vec<&str> {
        ranking.iter().map(|r| r.user.username.as_str()).collect()
    }

    fn ranks(ranking: &[RankedUser]) -> Vec<usize> {
        ranking.iter().map(|r| r.rank).collect()
    }

    #[test]
    fn ties_get_positional_ranks_in_input_order() {
        let users = vec![user("carol", 300, 1), user("alice", 500, 1), user("bob", 500, 1)];
        let ranking = rank_users(users, &[], SortBy::TotalScore, TimeRange::All, now());

        assert_eq!(names(&ranking), ["alice", "bob", "carol"]);
        assert_eq!(ranks(&ranking), [1, 2, 3]);
    }

    #[test]
    fn large_totals_order_exactly() {
        // Both round to the same f64.
        let big = 1u64 << 60;
        let users = vec![user("alice", big, 1), user("bob", big + 1, 1)];
        let ranking = rank_users(users, &[], SortBy::TotalScore, TimeRange::All, now());

        assert_eq!(names(&ranking), ["bob", "alice"]);
        assert_eq!(ranking[0].metric, Metric::Count(big + 1));
    }

    #[test]
    fn empty_board() {
        let ranking = rank_users(Vec::new(), &[], SortBy::AverageScore, TimeRange::Week, now());
        assert!(ranking.is_empty());
    }

    #[test]
    fn streak_criteria_read_the_aggregate() {
        let users = vec![
            UserAggregate { current_streak: 2, max_streak: 9, ..UserAggregate::new("alice") },
            UserAggregate { current_streak: 5, max_streak: 5, ..UserAggregate::new("bob") },
        ];

        let by_current = rank_users(users.clone(), &[], SortBy::CurrentStreak, TimeRange::Week, now());
        assert_eq!(names(&by_current), ["bob", "alice"]);

        let by_max = rank_users(users, &[], SortBy::MaxStreak, TimeRange::All, now());
        assert_eq!(names(&by_max), ["alice", "bob"]);
        assert_eq!(by_max[0].metric, Metric::Count(9));
    }

    #[test]
    fn average_of_a_user_with_no_sessions_is_zero() {
        let users = vec![user("idle", 0, 0), user("busy", 300, 2)];
        let ranking = rank_users(users, &[], SortBy::AverageScore, TimeRange::All, now());

        assert_eq!(names(&ranking), ["busy", "idle"]);
        assert_eq!(ranking[0].metric, Metric::Mean(150.0));
        assert_eq!(ranking[1].metric, Metric::Mean(0.0));
    }

    #[test]
    fn windows_recompute_from_sessions() {
        // Alice has the bigger all-time total but did nothing this week.
        let users = vec![user("alice", 5000, 2), user("bob", 700, 3)];
        let sessions = vec![
            session(1, "alice", 4000, 20),
            session(2, "alice", 1000, 40),
            session(3, "bob", 300, 1),
            session(4, "bob", 200, 3),
            session(5, "bob", 200, 10),
        ];

        let all = rank_users(users.clone(), &sessions, SortBy::TotalScore, TimeRange::All, now());
        assert_eq!(names(&all), ["alice", "bob"]);

        let month = rank_users(users.clone(), &sessions, SortBy::TotalScore, TimeRange::Month, now());
        assert_eq!(names(&month), ["alice", "bob"]);
        assert_eq!(month[0].metric, Metric::Count(4000));
        assert_eq!(month[1].metric, Metric::Count(700));

        let week = rank_users(users.clone(), &sessions, SortBy::TotalScore, TimeRange::Week, now());
        assert_eq!(names(&week), ["bob", "alice"]);
        assert_eq!(week[0].metric, Metric::Count(500));
        assert_eq!(week[1].metric, Metric::Count(0));

        let week_sessions = rank_users(users.clone(), &sessions, SortBy::TotalSessions, TimeRange::Week, now());
        assert_eq!(week_sessions[0].metric, Metric::Count(2));

        let week_average = rank_users(users, &sessions, SortBy::AverageScore, TimeRange::Week, now());
        assert_eq!(week_average[0].metric, Metric::Mean(250.0));
        assert_eq!(week_average[1].metric, Metric::Mean(0.0));
    }

    #[test]
    fn windowed_totals_include_streak_bonus() {
        let users = vec![user("alice", 0, 0)];
        let mut bonus_session = session(1, "alice", 100, 0);
        bonus_session.streak_bonus = 5;

        let ranking = rank_users(users, &[bonus_session], SortBy::TotalScore, TimeRange::Week, now());
        assert_eq!(ranking[0].metric, Metric::Count(105));
    }

    #[test]
    fn unknown_sort_falls_back_to_total_score() {
        assert_eq!(SortBy::parse_lenient(Some("elo")), SortBy::TotalScore);
        assert_eq!(SortBy::parse_lenient(None), SortBy::TotalScore);
        assert_eq!(SortBy::parse_lenient(Some("maxStreak")), SortBy::MaxStreak);
        assert_eq!(SortBy::parse_lenient(Some("averageScore")), SortBy::AverageScore);
    }

    #[test]
    fn unknown_range_falls_back_to_all_time() {
        assert_eq!(TimeRange::parse_lenient(Some("year")), TimeRange::All);
        assert_eq!(TimeRange::parse_lenient(Some("WEEK")), TimeRange::Week);
        assert_eq!(TimeRange::All.cutoff(now()), None);
    }

    #[test]
    fn rank_lookup() {
        let users = vec![user("alice", 10, 1), user("bob", 20, 1)];
        let ranking = rank_users(users, &[], SortBy::TotalScore, TimeRange::All, now());
        assert_eq!(rank_of(&ranking, "alice"), Some(2));
        assert_eq!(rank_of(&ranking, "nobody"), None);
    }
}
