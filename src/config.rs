use anyhow::{Context, Result, anyhow, ensure};
use itertools::Itertools;

/// Above this, a rating times the multiplier no longer fits the score column.
const MAX_STORABLE_RATING: f64 = 1e15;

/// Tunable constants for the scoring engine.
///
/// Defaults match the values the leaderboard launched with. Every number here can be
/// overridden from the environment, see [`EngineConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub scoring: ScoringConfig,
    pub streak: StreakConfig,
    pub leagues: LeagueThresholds,
    pub input_policy: CoercionPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    /// Points per rating point.
    pub base_multiplier: u64,
    /// Bonus awarded for a solve that takes no time at all.
    pub max_time_bonus: u64,
    /// Every session is worth at least this much.
    pub min_score: u64,
    /// Highest problem rating accepted. Keeps scores storable.
    pub max_rating: f64,
    /// Ascending `(rating upper bound, expected seconds)` pairs. A rating below the
    /// bound uses that duration.
    pub expected_times: Vec<(f64, f64)>,
    /// Expected seconds for ratings above every bound.
    pub fallback_expected_time: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StreakConfig {
    /// Length of a streak block, in days.
    pub block_days: u64,
    /// Points per complete block.
    pub block_bonus: u64,
}

/// Five ascending cut-offs separating the six league tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct LeagueThresholds(pub [u64; 5]);

/// What to do with a numeric field that doesn't parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoercionPolicy {
    /// Treat it as 0.
    #[default]
    Lenient,
    /// Reject the session.
    Strict,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_multiplier: 3,
            max_time_bonus: 50,
            min_score: 10,
            max_rating: 1e12,
            expected_times: vec![(1200.0, 1800.0), (1600.0, 2700.0), (2000.0, 3600.0)],
            fallback_expected_time: 5400.0,
        }
    }
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self { block_days: 5, block_bonus: 5 }
    }
}

impl Default for LeagueThresholds {
    fn default() -> Self {
        Self([1200, 2500, 6000, 12000, 25000])
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            streak: StreakConfig::default(),
            leagues: LeagueThresholds::default(),
            input_policy: CoercionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Builds the config from the process environment (and `.env`, if loaded).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, falling back to defaults for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("LEAGUE_THRESHOLDS") {
            config.leagues = parse_thresholds(&raw)
                .with_context(|| format!("Malformed LEAGUE_THRESHOLDS: '{raw}'"))?;
        }
        if let Some(raw) = lookup("EXPECTED_TIMES") {
            config.scoring.expected_times = parse_expected_times(&raw)
                .with_context(|| format!("Malformed EXPECTED_TIMES: '{raw}'"))?;
        }
        if let Some(raw) = lookup("EXPECTED_TIME_FALLBACK") {
            config.scoring.fallback_expected_time = parse_number(&raw, "EXPECTED_TIME_FALLBACK")?;
        }
        if let Some(raw) = lookup("MIN_SESSION_SCORE") {
            config.scoring.min_score = parse_number(&raw, "MIN_SESSION_SCORE")?;
        }
        if let Some(raw) = lookup("MAX_PROBLEM_RATING") {
            config.scoring.max_rating = parse_number(&raw, "MAX_PROBLEM_RATING")?;
        }
        if let Some(raw) = lookup("STREAK_BLOCK_DAYS") {
            config.streak.block_days = parse_number(&raw, "STREAK_BLOCK_DAYS")?;
        }
        if let Some(raw) = lookup("STREAK_BLOCK_BONUS") {
            config.streak.block_bonus = parse_number(&raw, "STREAK_BLOCK_BONUS")?;
        }
        if let Some(raw) = lookup("INPUT_POLICY") {
            config.input_policy = match raw.trim().to_lowercase().as_str() {
                "lenient" => CoercionPolicy::Lenient,
                "strict" => CoercionPolicy::Strict,
                other => return Err(anyhow!("INPUT_POLICY must be 'lenient' or 'strict', got '{other}'")),
            };
        }

        ensure!(config.streak.block_days > 0, "STREAK_BLOCK_DAYS must be positive.");
        ensure!(config.scoring.fallback_expected_time > 0.0,
                "EXPECTED_TIME_FALLBACK must be positive.");
        ensure!(config.scoring.max_rating > 0.0 && config.scoring.max_rating <= MAX_STORABLE_RATING,
                "MAX_PROBLEM_RATING must be positive and at most {MAX_STORABLE_RATING}.");

        log::debug!("[from_lookup] Loaded engine config: {config:?}");
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| anyhow!("{key} is not a valid number: '{raw}'"))
}

fn parse_thresholds(raw: &str) -> Result<LeagueThresholds> {
    let values = raw
        .split(',')
        .map(|v| parse_number::<u64>(v, "LEAGUE_THRESHOLDS"))
        .collect::<Result<Vec<_>>>()?;

    let thresholds: [u64; 5] = values
        .try_into()
        .map_err(|v: Vec<u64>| anyhow!("Expected 5 thresholds, got {}", v.len()))?;

    ensure!(thresholds.iter().tuple_windows().all(|(a, b)| a < b),
            "League thresholds must be strictly ascending.");

    Ok(LeagueThresholds(thresholds))
}

/// Parses `bound:seconds` pairs, e.g. `1200:1800,1600:2700`.
fn parse_expected_times(raw: &str) -> Result<Vec<(f64, f64)>> {
    let pairs = raw
        .split(',')
        .map(|pair| -> Result<(f64, f64)> {
            let (bound, secs) = pair
                .split(':')
                .collect_tuple()
                .with_context(|| format!("Expected 'bound:seconds', got '{pair}'"))?;
            let secs: f64 = parse_number(secs, "EXPECTED_TIMES")?;
            ensure!(secs > 0.0, "Expected time must be positive, got {secs}");
            Ok((parse_number(bound, "EXPECTED_TIMES")?, secs))
        })
        .collect::<Result<Vec<_>>>()?;

    ensure!(pairs.iter().tuple_windows().all(|(a, b)| a.0 < b.0),
            "Expected-time bounds must be strictly ascending.");

    Ok(pairs)
}
