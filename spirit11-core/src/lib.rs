mod valuation;

use std::{fmt, str::FromStr};

use thiserror::Error;

pub use valuation::{Valuation, compute_points, compute_value, round_to_cents, valuate};

/// Smallest denomination of the game currency.
pub type Money = i64;

pub const INITIAL_BUDGET: Money = 9_000_000;

pub const SQUAD_SIZE: usize = 11;

pub const BALLS_PER_OVER: u32 = 6;

/// Upper bound accepted for `overs_bowled`, far beyond any real tournament.
pub const MAX_OVERS_BOWLED: f64 = 10_000.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    Batsman,
    Bowler,
    AllRounder,
    WicketKeeper,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Batsman,
        Category::Bowler,
        Category::AllRounder,
        Category::WicketKeeper,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Batsman => "Batsman",
            Category::Bowler => "Bowler",
            Category::AllRounder => "All-rounder",
            Category::WicketKeeper => "Wicket-keeper",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown player category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "batsman" | "batter" => Ok(Category::Batsman),
            "bowler" => Ok(Category::Bowler),
            "allrounder" => Ok(Category::AllRounder),
            "wicketkeeper" => Ok(Category::WicketKeeper),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

/// Raw tournament statistics of a player.
///
/// `overs_bowled` uses cricket notation: the integer part counts complete
/// overs and the first decimal digit counts the remaining balls, so `4.3`
/// means 4 overs and 3 balls.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct PlayerStats {
    pub total_runs: u32,
    pub balls_faced: u32,
    pub innings_played: u32,
    pub wickets: u32,
    pub overs_bowled: f64,
    pub runs_conceded: u32,
}

impl PlayerStats {
    pub fn is_valid(&self) -> bool {
        self.overs_bowled.is_finite()
            && (0.0..=MAX_OVERS_BOWLED).contains(&self.overs_bowled)
    }

    pub fn total_balls_bowled(&self) -> u32 {
        let complete_overs = self.overs_bowled.trunc();
        // 4.3 % 1 is 0.2999.., so the remaining balls are rounded, not floored
        let remaining_balls = ((self.overs_bowled - complete_overs) * 10.0).round();
        (complete_overs as u32)
            .saturating_mul(BALLS_PER_OVER)
            .saturating_add(remaining_balls as u32)
    }
}
