use serde::{Deserialize, Serialize};

use crate::config::LeagueThresholds;

/// Leaderboard tiers, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum League {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Master,
    Legend,
}

impl League {
    pub const ALL: [League; 6] = [
        League::Beginner,
        League::Intermediate,
        League::Advanced,
        League::Expert,
        League::Master,
        League::Legend,
    ];

    /// The tier a total score lands in.
    pub fn classify(thresholds: &LeagueThresholds, total_score: u64) -> League {
        let tier = thresholds.0.iter().take_while(|&&cutoff| total_score >= cutoff).count();
        League::ALL[tier]
    }

    /// Position of this tier, 0 for Beginner.
    pub fn tier(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            League::Beginner => "Beginner",
            League::Intermediate => "Intermediate",
            League::Advanced => "Advanced",
            League::Expert => "Expert",
            League::Master => "Master",
            League::Legend => "Legend",
        }
    }
}

impl std::fmt::Display for League {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for League {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        League::ALL
            .into_iter()
            .find(|league| league.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown league: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_cutoffs() {
        let thresholds = LeagueThresholds::default();
        assert_eq!(League::classify(&thresholds, 0), League::Beginner);
        assert_eq!(League::classify(&thresholds, 1199), League::Beginner);
        assert_eq!(League::classify(&thresholds, 1200), League::Intermediate);
        assert_eq!(League::classify(&thresholds, 2499), League::Intermediate);
        assert_eq!(League::classify(&thresholds, 2500), League::Advanced);
        assert_eq!(League::classify(&thresholds, 6000), League::Expert);
        assert_eq!(League::classify(&thresholds, 12000), League::Master);
        assert_eq!(League::classify(&thresholds, 24999), League::Master);
        assert_eq!(League::classify(&thresholds, 25000), League::Legend);
        assert_eq!(League::classify(&thresholds, u64::MAX), League::Legend);
    }

    #[test]
    fn classification_is_monotonic() {
        let thresholds = LeagueThresholds::default();
        let mut previous = League::classify(&thresholds, 0);
        for score in (0..30_000).step_by(37) {
            let league = League::classify(&thresholds, score);
            assert!(league.tier() >= previous.tier());
            previous = league;
        }
    }

    #[test]
    fn custom_thresholds() {
        let thresholds = LeagueThresholds([10, 20, 30, 40, 50]);
        assert_eq!(League::classify(&thresholds, 9), League::Beginner);
        assert_eq!(League::classify(&thresholds, 35), League::Expert);
        assert_eq!(League::classify(&thresholds, 50), League::Legend);
    }

    #[test]
    fn names_round_trip_through_storage_text() {
        for league in League::ALL {
            assert_eq!(league.as_str().parse::<League>(), Ok(league));
        }
        assert!("Diamond".parse::<League>().is_err());
    }
}
