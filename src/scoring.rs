use crate::config::ScoringConfig;

/// Points for a solve before any streak bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolveScore {
    pub base_score: u64,
    pub time_bonus: u64,
    /// `base_score + time_bonus`, raised to the configured minimum.
    pub score: u64,
}

/// How long a problem of this rating is expected to take, in seconds.
pub fn expected_time(config: &ScoringConfig, rating: f64) -> f64 {
    config
        .expected_times
        .iter()
        .find(|(bound, _)| rating < *bound)
        .map_or(config.fallback_expected_time, |&(_, secs)| secs)
}

/// Scores a solve of a problem rated `rating` that took `elapsed` seconds.
///
/// Finishing under the expected time earns up to `max_time_bonus` extra points,
/// scaled by the fraction of the expected time left over. Unrated problems earn no
/// time bonus and only get the floor.
pub fn score_solve(config: &ScoringConfig, rating: f64, elapsed: f64) -> SolveScore {
    let rating = sanitize(rating);
    let elapsed = sanitize(elapsed);

    let base_score = (rating * config.base_multiplier as f64).floor() as u64;

    let expected = expected_time(config, rating);
    let time_bonus = if rating > 0.0 && elapsed < expected {
        ((expected - elapsed) / expected * config.max_time_bonus as f64).floor() as u64
    } else {
        0
    };

    SolveScore {
        base_score,
        time_bonus,
        score: base_score.saturating_add(time_bonus).max(config.min_score),
    }
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() { value.max(0.0) } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ScoringConfig {
        ScoringConfig::default()
    }

    #[test]
    fn expected_time_steps() {
        let config = config();
        assert_eq!(expected_time(&config, 0.0), 1800.0);
        assert_eq!(expected_time(&config, 1199.0), 1800.0);
        assert_eq!(expected_time(&config, 1200.0), 2700.0);
        assert_eq!(expected_time(&config, 1599.0), 2700.0);
        assert_eq!(expected_time(&config, 1600.0), 3600.0);
        assert_eq!(expected_time(&config, 2000.0), 5400.0);
        assert_eq!(expected_time(&config, 3500.0), 5400.0);
    }

    #[test]
    fn rating_1500_in_2000_seconds() {
        let solve = score_solve(&config(), 1500.0, 2000.0);
        assert_eq!(solve.base_score, 4500);
        assert_eq!(solve.time_bonus, 12);
        assert_eq!(solve.score, 4512);
    }

    #[test]
    fn zero_rating_gets_the_floor() {
        let solve = score_solve(&config(), 0.0, 5000.0);
        assert_eq!(solve.base_score, 0);
        assert_eq!(solve.time_bonus, 0);
        assert_eq!(solve.score, 10);
    }

    #[test]
    fn unrated_fast_solve_gets_only_the_floor() {
        let solve = score_solve(&config(), 0.0, 60.0);
        assert_eq!((solve.base_score, solve.time_bonus, solve.score), (0, 0, 10));
        assert_eq!(score_solve(&config(), 0.0, 0.0).score, 10);
    }

    #[test]
    fn huge_ratings_saturate() {
        let solve = score_solve(&config(), 1e19, 0.0);
        assert_eq!(solve.base_score, u64::MAX);
        assert_eq!(solve.score, u64::MAX);
    }

    #[test]
    fn instant_solve_gets_the_whole_bonus() {
        let solve = score_solve(&config(), 800.0, 0.0);
        assert_eq!(solve.time_bonus, 50);
        assert_eq!(solve.score, 2450);
    }

    #[test]
    fn slow_solves_get_no_bonus() {
        assert_eq!(score_solve(&config(), 2400.0, 5400.0).time_bonus, 0);
        assert_eq!(score_solve(&config(), 2400.0, 99_999.0).time_bonus, 0);
    }

    #[test]
    fn garbage_inputs_are_treated_as_zero() {
        assert_eq!(score_solve(&config(), f64::NAN, -20.0).score, 10);
        assert_eq!(score_solve(&config(), -1500.0, f64::INFINITY).score, 10);
    }

    #[test]
    fn score_never_below_floor() {
        let config = config();
        for rating in (0..4000).step_by(7) {
            for elapsed in (0..8000).step_by(131) {
                let solve = score_solve(&config, rating as f64, elapsed as f64);
                assert!(solve.score >= 10);
                if rating == 0 {
                    assert_eq!(solve.score, 10);
                }
            }
        }
    }

    #[test]
    fn faster_never_scores_less() {
        let config = config();
        for rating in [0.0, 900.0, 1200.0, 1450.0, 1800.0, 2600.0] {
            let mut previous = score_solve(&config, rating, 10_000.0).score;
            for elapsed in (0..10_000).rev().step_by(50) {
                let score = score_solve(&config, rating, elapsed as f64).score;
                assert!(score >= previous, "rating {rating}, elapsed {elapsed}");
                previous = score;
            }
        }
    }

    #[test]
    fn breakpoints_are_configurable() {
        let config = ScoringConfig {
            expected_times: vec![(1000.0, 100.0)],
            fallback_expected_time: 200.0,
            ..ScoringConfig::default()
        };
        assert_eq!(score_solve(&config, 500.0, 50.0).time_bonus, 25);
        assert_eq!(score_solve(&config, 1500.0, 50.0).time_bonus, 37);
    }
}
