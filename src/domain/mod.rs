//! Domain types for guild progression with strong typing.
//!
//! Rank derivation and experience awards are pure functions here so the
//! persistence layer only has to store their results.

pub mod missions;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use missions::{MISSION_CATALOG, MissionInfo, MissionStatus};

/// Progression tier of a guild member.
///
/// Always derived from the number of completed missions, see
/// [`GuildRank::for_missions_completed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum GuildRank {
    #[default]
    Apprentice,
    Adept,
    Journeyman,
    Expert,
    Master,
}

impl GuildRank {
    /// Minimum missions completed for each rank, most senior first.
    pub const THRESHOLDS: [(i32, Self); 4] = [
        (13, Self::Master),
        (10, Self::Expert),
        (7, Self::Journeyman),
        (3, Self::Adept),
    ];

    /// The most senior rank whose threshold `missions_completed` reaches.
    #[must_use]
    pub fn for_missions_completed(missions_completed: i32) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(threshold, _)| missions_completed >= *threshold)
            .map_or(Self::Apprentice, |(_, rank)| *rank)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Apprentice => "Apprentice",
            Self::Adept => "Adept",
            Self::Journeyman => "Journeyman",
            Self::Expert => "Expert",
            Self::Master => "Master",
        }
    }
}

impl fmt::Display for GuildRank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GuildRank {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Apprentice" => Ok(Self::Apprentice),
            "Adept" => Ok(Self::Adept),
            "Journeyman" => Ok(Self::Journeyman),
            "Expert" => Ok(Self::Expert),
            "Master" => Ok(Self::Master),
            other => Err(format!("Unknown guild rank: {other}")),
        }
    }
}

/// Highest score accepted for a single completion.
pub const MAX_MISSION_SCORE: f64 = 10_000.0;

/// Experience awarded for a completion score: `floor(score / 10)`.
///
/// Callers validate the score first; negative or non-finite input yields 0.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn experience_for_score(score: f64) -> i32 {
    if !score.is_finite() || score <= 0.0 {
        return 0;
    }
    (score.min(MAX_MISSION_SCORE) / 10.0).floor() as i32
}
