use crate::{Money, PlayerStats};

const VALUE_STEP: f64 = 50_000.0;

/// Points and value always derived together from one stats snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Valuation {
    pub points: f64,
    pub value: Money,
}

pub fn valuate(stats: &PlayerStats) -> Valuation {
    let points = compute_points(stats);
    Valuation {
        points,
        value: compute_value(points),
    }
}

pub fn compute_points(stats: &PlayerStats) -> f64 {
    let total_runs = stats.total_runs as f64;

    let batting_strike_rate = if stats.balls_faced > 0 {
        total_runs / stats.balls_faced as f64 * 100.0
    } else {
        0.0
    };

    let batting_average = if stats.innings_played > 0 {
        total_runs / stats.innings_played as f64
    } else {
        0.0
    };

    let total_balls_bowled = stats.total_balls_bowled() as f64;

    let bowling_strike_rate = if stats.wickets > 0 && total_balls_bowled > 0.0 {
        total_balls_bowled / stats.wickets as f64
    } else {
        0.0
    };

    let economy_rate = if total_balls_bowled > 0.0 {
        stats.runs_conceded as f64 / total_balls_bowled * 6.0
    } else {
        0.0
    };

    let mut points = batting_strike_rate / 5.0 + batting_average * 0.8;
    if bowling_strike_rate > 0.0 {
        points += 500.0 / bowling_strike_rate;
    }
    if economy_rate > 0.0 {
        points += 140.0 / economy_rate;
    }

    round_to_cents(points)
}

pub fn compute_value(points: f64) -> Money {
    let value = (9.0 * points + 100.0) * 1000.0;
    ((value / VALUE_STEP + 0.5).floor() * VALUE_STEP) as Money
}

/// Round half up at two decimal places.
pub fn round_to_cents(x: f64) -> f64 {
    (x * 100.0 + 0.5).floor() / 100.0
}
