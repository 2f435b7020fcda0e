//! Ranking and tie-break rules.
//!
//! Every list operation is re-sorted here after fetching, so two backends
//! that return equal-ranked rows in different orders still produce the
//! same result.

use crate::models::{AssistRow, GameRow, PenaltyRow, ScorerRow, StandingRow};
use std::cmp::Ordering;

/// Criteria used to order teams in the standings, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandingCriteria {
    Points,
    GoalDifference,
    GoalsFor,
    Wins,
    /// Alphabetical; last resort so the order is total.
    TeamName,
}

pub const STANDING_CRITERIA: [StandingCriteria; 5] = [
    StandingCriteria::Points,
    StandingCriteria::GoalDifference,
    StandingCriteria::GoalsFor,
    StandingCriteria::Wins,
    StandingCriteria::TeamName,
];

impl StandingCriteria {
    pub fn compare(&self, a: &StandingRow, b: &StandingRow) -> Ordering {
        match self {
            StandingCriteria::Points => b.points.cmp(&a.points),
            StandingCriteria::GoalDifference => b.goal_difference().cmp(&a.goal_difference()),
            StandingCriteria::GoalsFor => b.goals_for.cmp(&a.goals_for),
            StandingCriteria::Wins => b.wins.cmp(&a.wins),
            StandingCriteria::TeamName => a.team.cmp(&b.team),
        }
    }
}

fn compare_standings(a: &StandingRow, b: &StandingRow) -> Ordering {
    STANDING_CRITERIA
        .iter()
        .map(|criteria| criteria.compare(a, b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Higher count first, then player name, then team name.
fn compare_leaders(count_a: u64, count_b: u64, a: (&str, &str), b: (&str, &str)) -> Ordering {
    count_b
        .cmp(&count_a)
        .then_with(|| a.0.cmp(b.0))
        .then_with(|| a.1.cmp(b.1))
}

pub fn sort_standings(rows: &mut [StandingRow]) {
    rows.sort_by(compare_standings);
}

pub fn sort_scorers(rows: &mut [ScorerRow]) {
    rows.sort_by(|a, b| {
        compare_leaders(a.goals, b.goals, (&a.player, &a.team), (&b.player, &b.team))
    });
}

pub fn sort_assists(rows: &mut [AssistRow]) {
    rows.sort_by(|a, b| {
        compare_leaders(a.assists, b.assists, (&a.player, &a.team), (&b.player, &b.team))
    });
}

/// Penalty minutes break ties in penalty count before names do.
pub fn sort_penalties(rows: &mut [PenaltyRow]) {
    rows.sort_by(|a, b| {
        b.penalties
            .cmp(&a.penalties)
            .then_with(|| b.penalty_minutes.cmp(&a.penalty_minutes))
            .then_with(|| a.player.cmp(&b.player))
            .then_with(|| a.team.cmp(&b.team))
    });
}

/// Newest first. ISO dates sort correctly as strings.
pub fn sort_games(rows: &mut [GameRow]) {
    rows.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| a.home_team.cmp(&b.home_team))
            .then_with(|| a.away_team.cmp(&b.away_team))
    });
}

/// Sort with `sort` and keep the first `n` rows.
pub fn top<T>(mut rows: Vec<T>, sort: fn(&mut [T]), n: usize) -> Vec<T> {
    sort(&mut rows);
    rows.truncate(n);
    rows
}
