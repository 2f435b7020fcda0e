//! The fixed set of traversals behind every statistic.
//!
//! Every scoped query walks `Game -PART_OF-> Season -PART_OF-> Competition`
//! with both names bound, so a season name shared by two competitions
//! never leaks games across them.

use super::spec::{lit, node, prop, Direction, Expr, NodePattern, PathPattern, QuerySpec};
use crate::models::GameResult;
use serde_json::Value;

pub const PARAM_COMPETITION: &str = "competition";
pub const PARAM_SEASON: &str = "season";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_TEAM: &str = "team_name";

/// `(s:Season {name: $season})-[:PART_OF]->(c:Competition {name: $competition})`
fn season_in_competition() -> PathPattern {
    PathPattern::from(node("s", "Season")).to(
        "PART_OF",
        node("c", "Competition").with("name", PARAM_COMPETITION),
    )
}

fn scoped_season() -> NodePattern {
    node("s", "Season").with("name", PARAM_SEASON)
}

fn player_name() -> Expr {
    Expr::Concat(vec![prop("p", "firstName"), lit(" "), prop("p", "lastName")])
}

fn result_codes(results: &[GameResult]) -> Vec<Value> {
    results
        .iter()
        .map(|r| Value::String(r.code().to_string()))
        .collect()
}

fn count_results(results: &[GameResult]) -> Expr {
    Expr::CountIn {
        expr: Box::new(prop("rel", "result")),
        values: result_codes(results),
    }
}

/// Players ranked by the number of `rel` edges into scoped events.
fn player_event_leaders(
    name: &'static str,
    rel: &'static str,
    event_var: &'static str,
    event_label: &'static str,
    count_alias: &'static str,
) -> QuerySpec {
    QuerySpec::new(name)
        .matching(
            PathPattern::from(node("p", "Player"))
                .to(rel, node(event_var, event_label))
                .to("IN_GAME", node("game", "Game"))
                .to("PART_OF", scoped_season()),
        )
        .matching(season_in_competition())
        .matching(PathPattern::from(node("p", "Player")).to("PLAYS_FOR", node("t", "Team")))
        .returning("player", player_name())
        .returning("team", prop("t", "name"))
        .returning(count_alias, Expr::Count(event_var))
}

pub fn top_goal_scorers() -> QuerySpec {
    player_event_leaders("top_goal_scorers", "SCORED", "g", "Goal", "goals")
        .order_by("goals", Direction::Desc)
        .order_by("player", Direction::Asc)
        .order_by("team", Direction::Asc)
        .limit(PARAM_LIMIT)
}

pub fn assist_leaders() -> QuerySpec {
    player_event_leaders("assist_leaders", "ASSISTED_IN", "g", "Goal", "assists")
        .order_by("assists", Direction::Desc)
        .order_by("player", Direction::Asc)
        .order_by("team", Direction::Asc)
        .limit(PARAM_LIMIT)
}

pub fn penalty_leaders() -> QuerySpec {
    player_event_leaders("penalty_leaders", "COMMITTED", "pen", "Penalty", "penalties")
        .returning("penalty_minutes", Expr::Sum(Box::new(prop("pen", "minutes"))))
        .order_by("penalties", Direction::Desc)
        .order_by("penalty_minutes", Direction::Desc)
        .order_by("player", Direction::Asc)
        .order_by("team", Direction::Asc)
        .limit(PARAM_LIMIT)
}

/// Per-game record columns shared by standings and single-team queries.
fn with_record_columns(spec: QuerySpec) -> QuerySpec {
    spec.returning("games", Expr::Count("g"))
        .returning("wins", count_results(&[GameResult::Win, GameResult::OvertimeWin]))
        .returning("losses", count_results(&[GameResult::Loss, GameResult::OvertimeLoss]))
        .returning("ties", count_results(&[GameResult::Tie]))
        .returning("overtime_wins", count_results(&[GameResult::OvertimeWin]))
        .returning("overtime_losses", count_results(&[GameResult::OvertimeLoss]))
        .returning("goals_for", Expr::Sum(Box::new(prop("rel", "goalsFor"))))
        .returning("goals_against", Expr::Sum(Box::new(prop("rel", "goalsAgainst"))))
        .returning("points", Expr::Sum(Box::new(prop("rel", "points"))))
}

pub fn team_standings() -> QuerySpec {
    let spec = QuerySpec::new("team_standings")
        .matching(
            PathPattern::from(node("t", "Team"))
                .to_via("rel", "PLAYED", node("g", "Game"))
                .to("PART_OF", scoped_season()),
        )
        .matching(season_in_competition())
        .returning("team", prop("t", "name"));

    with_record_columns(spec)
        .order_by("points", Direction::Desc)
        .order_by("goals_for", Direction::Desc)
        .order_by("team", Direction::Asc)
}

/// Global aggregation over one team: always yields exactly one row.
pub fn team_performance() -> QuerySpec {
    let spec = QuerySpec::new("team_performance")
        .matching(
            PathPattern::from(node("t", "Team").with("name", PARAM_TEAM))
                .to_via("rel", "PLAYED", node("g", "Game"))
                .to("PART_OF", scoped_season()),
        )
        .matching(season_in_competition());

    with_record_columns(spec)
}

/// Scoped games in listing order: newest first, then by home and away team.
fn scoped_games(name: &'static str) -> QuerySpec {
    QuerySpec::new(name)
        .matching(PathPattern::from(node("g", "Game")).to("PART_OF", scoped_season()))
        .matching(season_in_competition())
        .returning("date", prop("g", "date"))
        .returning("home_team", prop("g", "homeTeam"))
        .returning("away_team", prop("g", "awayTeam"))
        .returning("score", prop("g", "score"))
        .returning("spectators", prop("g", "spectators"))
        .order_by("date", Direction::Desc)
        .order_by("home_team", Direction::Asc)
        .order_by("away_team", Direction::Asc)
}

pub fn recent_games() -> QuerySpec {
    scoped_games("recent_games").limit(PARAM_LIMIT)
}

/// Every game of the season, unlimited.
pub fn season_games() -> QuerySpec {
    scoped_games("season_games")
}

/// Scoped `PLAYED` edges counted per result code.
pub fn result_breakdown() -> QuerySpec {
    QuerySpec::new("result_breakdown")
        .matching(
            PathPattern::from(node("t", "Team"))
                .to_via("rel", "PLAYED", node("g", "Game"))
                .to("PART_OF", scoped_season()),
        )
        .matching(season_in_competition())
        .returning("result", prop("rel", "result"))
        .returning("edges", Expr::Count("rel"))
        .order_by("result", Direction::Asc)
}

pub fn competitions() -> QuerySpec {
    QuerySpec::new("competitions")
        .matching(PathPattern::from(node("c", "Competition")))
        .returning("name", prop("c", "name"))
        .order_by("name", Direction::Asc)
}

pub fn seasons() -> QuerySpec {
    QuerySpec::new("seasons")
        .matching(season_in_competition())
        .returning("name", prop("s", "name"))
        .order_by("name", Direction::Asc)
}

pub fn teams() -> QuerySpec {
    QuerySpec::new("teams")
        .matching(PathPattern::from(node("t", "Team")))
        .returning("name", prop("t", "name"))
        .returning("short_name", prop("t", "shortName"))
        .order_by("name", Direction::Asc)
}

/// Cheapest query every backend can answer; used as a connectivity probe.
pub fn health_check() -> QuerySpec {
    QuerySpec::new("health_check")
        .matching(PathPattern::from(node("c", "Competition")))
        .returning("competitions", Expr::Count("c"))
}
