//! Data models for the statistics layer.
//!
//! This module contains the scope parameters, the typed result rows each
//! operation returns and the report envelope handed to the renderer.

use crate::error::{StatsError, StatsResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome recorded on a `PLAYED` edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameResult {
    /// Regulation win.
    #[serde(rename = "W")]
    Win,
    /// Regulation loss.
    #[serde(rename = "L")]
    Loss,
    /// Tie/draw.
    #[serde(rename = "T")]
    Tie,
    /// Win in overtime or shootout.
    #[serde(rename = "OTW")]
    OvertimeWin,
    /// Loss in overtime or shootout.
    #[serde(rename = "OTL")]
    OvertimeLoss,
}

impl GameResult {
    /// Every result code, in report order.
    pub const ALL: [GameResult; 5] = [
        GameResult::Win,
        GameResult::OvertimeWin,
        GameResult::Tie,
        GameResult::OvertimeLoss,
        GameResult::Loss,
    ];

    /// Code stored in the graph.
    pub fn code(&self) -> &'static str {
        match self {
            GameResult::Win => "W",
            GameResult::Loss => "L",
            GameResult::Tie => "T",
            GameResult::OvertimeWin => "OTW",
            GameResult::OvertimeLoss => "OTL",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "W" => Some(GameResult::Win),
            "L" => Some(GameResult::Loss),
            "T" => Some(GameResult::Tie),
            "OTW" => Some(GameResult::OvertimeWin),
            "OTL" => Some(GameResult::OvertimeLoss),
            _ => None,
        }
    }
}

impl fmt::Display for GameResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameResult::Win => write!(f, "Win"),
            GameResult::Loss => write!(f, "Loss"),
            GameResult::Tie => write!(f, "Tie"),
            GameResult::OvertimeWin => write!(f, "Overtime win"),
            GameResult::OvertimeLoss => write!(f, "Overtime loss"),
        }
    }
}

/// A validated (competition, season) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub competition: String,
    pub season: String,
}

impl Scope {
    /// Build a scope, rejecting missing or blank names.
    pub fn new(competition: Option<&str>, season: Option<&str>) -> StatsResult<Self> {
        Ok(Self {
            competition: required("competition", competition)?,
            season: required("season", season)?,
        })
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.competition, self.season)
    }
}

/// Trim a required name, rejecting absent or blank values.
pub(crate) fn required(field: &str, value: Option<&str>) -> StatsResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        Some(_) => Err(StatsError::InvalidScope(format!("{} must not be blank", field))),
        None => Err(StatsError::InvalidScope(format!("{} is required", field))),
    }
}

/// One row of the goal scorer leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScorerRow {
    pub player: String,
    pub team: String,
    pub goals: u64,
}

/// One row of the assist leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistRow {
    pub player: String,
    pub team: String,
    pub assists: u64,
}

/// One row of the penalty leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyRow {
    pub player: String,
    pub team: String,
    pub penalties: u64,
    pub penalty_minutes: u64,
}

/// Aggregated record of a team over a season.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub team: String,
    pub games: u64,
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
    pub overtime_wins: u64,
    pub overtime_losses: u64,
    pub goals_for: u64,
    pub goals_against: u64,
    pub points: u64,
}

impl StandingRow {
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    pub fn points_per_game(&self) -> f64 {
        ratio(self.points, self.games)
    }

    /// Wins as a percentage of games played.
    pub fn win_percentage(&self) -> f64 {
        ratio(self.wins, self.games) * 100.0
    }
}

fn ratio(numerator: u64, games: u64) -> f64 {
    if games == 0 {
        0.0
    } else {
        numerator as f64 / games as f64
    }
}

/// Summary of one team in one season.
///
/// A team without games in scope has `games == 0`; it is still a valid
/// result, reported through [`TeamPerformance::has_data`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamPerformance {
    #[serde(flatten)]
    pub record: StandingRow,
}

impl TeamPerformance {
    /// Zeroed summary for a team with no games in scope.
    pub fn empty(team: &str) -> Self {
        Self {
            record: StandingRow {
                team: team.to_string(),
                ..StandingRow::default()
            },
        }
    }

    pub fn has_data(&self) -> bool {
        self.record.games > 0
    }

    pub fn games_played(&self) -> u64 {
        self.record.games
    }
}

/// A game as listed in the recent games view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRow {
    pub date: String,
    pub home_team: String,
    pub away_team: String,
    pub score: Option<String>,
    pub spectators: Option<u64>,
}

impl GameRow {
    /// The game date, if stored as `YYYY-MM-DD`.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Total goals from a `"home-away"` score string.
    pub fn total_goals(&self) -> Option<u64> {
        let (home, away) = self.score.as_deref()?.split_once('-')?;
        Some(home.trim().parse::<u64>().ok()? + away.trim().parse::<u64>().ok()?)
    }
}

/// A team as listed in the team directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub short_name: Option<String>,
}

/// Headline numbers for a season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeagueSummary {
    pub teams: usize,
    pub games: u64,
    pub goals: u64,
    pub average_goals_per_game: f64,
}

impl LeagueSummary {
    /// Derive the summary from standings; every game appears on two rows.
    pub fn from_standings(standings: &[StandingRow]) -> Self {
        let team_games: u64 = standings.iter().map(|r| r.games).sum();
        let goals: u64 = standings.iter().map(|r| r.goals_for).sum();
        let games = team_games / 2;

        Self {
            teams: standings.len(),
            games,
            goals,
            average_goals_per_game: ratio(goals, games),
        }
    }
}

/// Combined season overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dashboard {
    pub summary: LeagueSummary,
    pub standings: Vec<StandingRow>,
    pub top_scorers: Vec<ScorerRow>,
    pub recent_games: Vec<GameRow>,
}

/// How many `PLAYED` edges in scope carry one result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultCount {
    pub result: GameResult,
    pub count: u64,
}

/// Attendance, scoring and outcome figures over every game of a season.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameStatistics {
    pub games: u64,
    pub first_game: Option<NaiveDate>,
    pub last_game: Option<NaiveDate>,
    pub total_attendance: u64,
    pub average_attendance: Option<f64>,
    pub highest_attendance: Option<u64>,
    pub lowest_attendance: Option<u64>,
    /// Goals over games with a readable score.
    pub total_goals: u64,
    pub average_goals_per_game: f64,
    pub highest_scoring_game: Option<GameRow>,
    /// Games decided in regulation (one `W` edge each).
    pub regulation_games: u64,
    /// Games decided in overtime or a shootout (one `OTW` edge each).
    pub overtime_games: u64,
    /// Drawn games (two `T` edges each).
    pub tied_games: u64,
    pub results: Vec<ResultCount>,
    /// `PLAYED` edges whose result code is not recognised.
    pub unrecognized_results: u64,
}

impl GameStatistics {
    /// Summarise the scoped games and the per-code edge counts.
    ///
    /// `games` is expected in listing order; the first of several equally
    /// high-scoring games is reported.
    pub fn from_games(games: &[GameRow], results: Vec<ResultCount>, unrecognized_results: u64) -> Self {
        let attendance: Vec<u64> = games.iter().filter_map(|g| g.spectators).collect();
        let total_attendance: u64 = attendance.iter().sum();

        let mut total_goals = 0;
        let mut scored_games = 0;
        let mut highest_scoring_game: Option<(u64, &GameRow)> = None;
        for game in games {
            let Some(goals) = game.total_goals() else {
                continue;
            };
            total_goals += goals;
            scored_games += 1;
            if highest_scoring_game.map_or(true, |(best, _)| goals > best) {
                highest_scoring_game = Some((goals, game));
            }
        }

        let dates: Vec<NaiveDate> = games.iter().filter_map(GameRow::parsed_date).collect();
        let edges = |wanted: GameResult| {
            results
                .iter()
                .filter(|r| r.result == wanted)
                .map(|r| r.count)
                .sum::<u64>()
        };

        Self {
            games: games.len() as u64,
            first_game: dates.iter().min().copied(),
            last_game: dates.iter().max().copied(),
            total_attendance,
            average_attendance: if attendance.is_empty() {
                None
            } else {
                Some(total_attendance as f64 / attendance.len() as f64)
            },
            highest_attendance: attendance.iter().max().copied(),
            lowest_attendance: attendance.iter().min().copied(),
            total_goals,
            average_goals_per_game: ratio(total_goals, scored_games),
            highest_scoring_game: highest_scoring_game.map(|(_, game)| game.clone()),
            regulation_games: edges(GameResult::Win),
            overtime_games: edges(GameResult::OvertimeWin),
            tied_games: edges(GameResult::Tie) / 2,
            results,
            unrecognized_results,
        }
    }
}

/// The result set of one view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "view", content = "data", rename_all = "snake_case")]
pub enum ReportBody {
    Dashboard(Dashboard),
    Standings(Vec<StandingRow>),
    Scorers(Vec<ScorerRow>),
    Assists(Vec<AssistRow>),
    Penalties(Vec<PenaltyRow>),
    Team(TeamPerformance),
    Games(Vec<GameRow>),
    GameStats(GameStatistics),
    Competitions(Vec<String>),
    Seasons(Vec<String>),
    Teams(Vec<TeamInfo>),
}

impl ReportBody {
    /// Number of result rows (a team summary counts as one when present).
    pub fn row_count(&self) -> usize {
        match self {
            ReportBody::Dashboard(d) => d.standings.len(),
            ReportBody::Standings(rows) => rows.len(),
            ReportBody::Scorers(rows) => rows.len(),
            ReportBody::Assists(rows) => rows.len(),
            ReportBody::Penalties(rows) => rows.len(),
            ReportBody::Team(perf) => usize::from(perf.has_data()),
            ReportBody::Games(rows) => rows.len(),
            ReportBody::GameStats(stats) => stats.games as usize,
            ReportBody::Competitions(rows) => rows.len(),
            ReportBody::Seasons(rows) => rows.len(),
            ReportBody::Teams(rows) => rows.len(),
        }
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub competition: Option<String>,
    pub season: Option<String>,
    /// Description of the data source queried.
    pub source: String,
    pub generated_at: DateTime<Utc>,
    pub duration_seconds: f64,
}

/// A complete report: metadata plus one view's results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    #[serde(flatten)]
    pub body: ReportBody,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standing(team: &str, games: u64, wins: u64, gf: u64, ga: u64, points: u64) -> StandingRow {
        StandingRow {
            team: team.to_string(),
            games,
            wins,
            losses: games - wins,
            goals_for: gf,
            goals_against: ga,
            points,
            ..StandingRow::default()
        }
    }

    #[test]
    fn test_game_result_codes() {
        for result in [
            GameResult::Win,
            GameResult::Loss,
            GameResult::Tie,
            GameResult::OvertimeWin,
            GameResult::OvertimeLoss,
        ] {
            assert_eq!(GameResult::from_code(result.code()), Some(result));
        }
        assert_eq!(GameResult::from_code(" otl "), Some(GameResult::OvertimeLoss));
        assert_eq!(GameResult::from_code("X"), None);
    }

    #[test]
    fn test_scope_validation() {
        let scope = Scope::new(Some(" SHL "), Some("2024/2025")).unwrap();
        assert_eq!(scope.competition, "SHL");
        assert_eq!(scope.to_string(), "SHL 2024/2025");

        assert!(Scope::new(None, Some("2024/2025")).unwrap_err().is_input_error());
        assert!(Scope::new(Some("SHL"), Some("   ")).unwrap_err().is_input_error());
    }

    #[test]
    fn test_standing_derived_values() {
        let row = standing("Frölunda HC", 25, 18, 156, 98, 54);
        assert_eq!(row.goal_difference(), 58);
        assert!((row.points_per_game() - 2.16).abs() < 1e-9);
        assert!((row.win_percentage() - 72.0).abs() < 1e-9);

        let empty = StandingRow::default();
        assert_eq!(empty.points_per_game(), 0.0);
        assert_eq!(empty.win_percentage(), 0.0);
    }

    #[test]
    fn test_league_summary_counts_each_game_once() {
        let rows = vec![standing("A", 1, 1, 5, 2, 3), standing("B", 1, 0, 2, 5, 0)];
        let summary = LeagueSummary::from_standings(&rows);
        assert_eq!(summary.teams, 2);
        assert_eq!(summary.games, 1);
        assert_eq!(summary.goals, 7);
        assert!((summary.average_goals_per_game - 7.0).abs() < 1e-9);

        assert_eq!(LeagueSummary::from_standings(&[]), LeagueSummary::default());
    }

    #[test]
    fn test_game_row_helpers() {
        let game = GameRow {
            date: "2024-12-10".to_string(),
            home_team: "Frölunda HC".to_string(),
            away_team: "Linköping HC".to_string(),
            score: Some("4-2".to_string()),
            spectators: Some(12500),
        };
        assert_eq!(game.total_goals(), Some(6));
        assert_eq!(game.parsed_date(), NaiveDate::from_ymd_opt(2024, 12, 10));
    }

    fn game(date: &str, home: &str, away: &str, score: Option<&str>, spectators: Option<u64>) -> GameRow {
        GameRow {
            date: date.to_string(),
            home_team: home.to_string(),
            away_team: away.to_string(),
            score: score.map(str::to_string),
            spectators,
        }
    }

    #[test]
    fn test_game_statistics() {
        let games = vec![
            game("2024-10-12", "Luleå HF", "Brynäs IF", Some("3-4"), Some(6200)),
            game("2024-10-05", "Frölunda HC", "Växjö Lakers", Some("5-2"), Some(12044)),
            game("2024-09-21", "Färjestad BK", "Rögle BK", Some("2-2"), None),
            game("2024-09-14", "HV 71", "Leksands IF", None, Some(5100)),
        ];
        let results = vec![
            ResultCount { result: GameResult::Win, count: 1 },
            ResultCount { result: GameResult::OvertimeWin, count: 1 },
            ResultCount { result: GameResult::Tie, count: 2 },
            ResultCount { result: GameResult::OvertimeLoss, count: 1 },
            ResultCount { result: GameResult::Loss, count: 1 },
        ];

        let stats = GameStatistics::from_games(&games, results, 0);
        assert_eq!(stats.games, 4);
        assert_eq!(stats.first_game, NaiveDate::from_ymd_opt(2024, 9, 14));
        assert_eq!(stats.last_game, NaiveDate::from_ymd_opt(2024, 10, 12));
        assert_eq!(stats.total_attendance, 23344);
        assert_eq!(stats.highest_attendance, Some(12044));
        assert_eq!(stats.lowest_attendance, Some(5100));
        assert!((stats.average_attendance.unwrap() - 23344.0 / 3.0).abs() < 1e-9);

        // 7 + 7 + 4 over the three games with a score
        assert_eq!(stats.total_goals, 18);
        assert!((stats.average_goals_per_game - 6.0).abs() < 1e-9);
        assert_eq!(stats.highest_scoring_game.unwrap().home_team, "Luleå HF");

        assert_eq!(stats.regulation_games, 1);
        assert_eq!(stats.overtime_games, 1);
        assert_eq!(stats.tied_games, 1);
    }

    #[test]
    fn test_game_statistics_without_games() {
        let stats = GameStatistics::from_games(&[], Vec::new(), 0);
        assert_eq!(stats, GameStatistics::default());
        assert_eq!(stats.average_attendance, None);
        assert_eq!(stats.average_goals_per_game, 0.0);
    }

    #[test]
    fn test_empty_team_performance() {
        let perf = TeamPerformance::empty("HV 71");
        assert!(!perf.has_data());
        assert_eq!(perf.games_played(), 0);
        assert_eq!(perf.record.team, "HV 71");
    }

    #[test]
    fn test_report_body_serialization_tag() {
        let body = ReportBody::Seasons(vec!["2023/2024".to_string()]);
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"view":"seasons","data":["2023/2024"]}"#);
    }
}
