use chrono::NaiveDate;

use crate::config::StreakConfig;

/// A user's streak after logging a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub current_streak: u64,
    pub max_streak: u64,
    pub streak_bonus: u64,
}

/// Advances a streak for a session logged on `today`.
///
/// - Last qualifying session yesterday: the streak grows by one.
/// - Last qualifying session today: the streak stays where it is.
/// - Anything else (no history, a gap, a clock that went backwards): back to 1.
///
/// The bonus is paid on the streak *after* the update.
pub fn advance(
    config: &StreakConfig,
    current_streak: u64,
    max_streak: u64,
    last_qualifying: Option<NaiveDate>,
    today: NaiveDate,
) -> StreakUpdate {
    let current_streak = match last_qualifying {
        Some(last) if last == today && current_streak > 0 => current_streak,
        Some(last) if today.pred_opt() == Some(last) => current_streak + 1,
        _ => 1,
    };

    StreakUpdate {
        current_streak,
        max_streak: max_streak.max(current_streak),
        streak_bonus: streak_bonus(config, current_streak),
    }
}

/// A flat bonus for every complete block of consecutive days.
pub fn streak_bonus(config: &StreakConfig, streak: u64) -> u64 {
    (streak / config.block_days) * config.block_bonus
}
