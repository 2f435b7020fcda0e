//! The statistics operations.

use super::ranking;
use crate::error::{StatsError, StatsResult};
use crate::models::{
    required, AssistRow, Dashboard, GameResult, GameRow, GameStatistics, LeagueSummary, PenaltyRow, ResultCount,
    ScorerRow, Scope, StandingRow, TeamInfo, TeamPerformance,
};
use crate::query::catalog::{self, PARAM_COMPETITION, PARAM_LIMIT, PARAM_SEASON, PARAM_TEAM};
use crate::query::{Params, QuerySpec};
use crate::source::{DataSource, Record};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

/// Runs the fixed catalog of statistics queries against a data source.
///
/// The service holds no per-request state; clones share the same source
/// and can be used from concurrent tasks.
#[derive(Clone)]
pub struct StatsService {
    source: Arc<dyn DataSource>,
    default_limit: usize,
    max_limit: usize,
}

impl StatsService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            default_limit: DEFAULT_LIMIT,
            max_limit: MAX_LIMIT,
        }
    }

    /// Override the default and maximum leaderboard sizes.
    pub fn with_limits(mut self, default_limit: usize, max_limit: usize) -> Self {
        self.default_limit = default_limit;
        self.max_limit = max_limit;
        self
    }

    pub fn source_description(&self) -> String {
        self.source.describe()
    }

    /// Resolve an optional limit against the configured bounds.
    pub fn resolve_limit(&self, limit: Option<usize>) -> StatsResult<usize> {
        let limit = limit.unwrap_or(self.default_limit);
        if limit == 0 || limit > self.max_limit {
            return Err(StatsError::InvalidScope(format!(
                "limit must be between 1 and {}, got {}",
                self.max_limit, limit
            )));
        }
        Ok(limit)
    }

    async fn fetch(&self, spec: QuerySpec, params: Params) -> StatsResult<Vec<Record>> {
        let start = Instant::now();
        let records = self.source.execute(&spec, &params).await?;
        debug!(
            "{} returned {} records in {:.3}s",
            spec.name,
            records.len(),
            start.elapsed().as_secs_f64()
        );
        Ok(records)
    }

    pub async fn top_goal_scorers(
        &self,
        competition: &str,
        season: &str,
        limit: Option<usize>,
    ) -> StatsResult<Vec<ScorerRow>> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let limit = self.resolve_limit(limit)?;
        info!("Fetching top {} goal scorers for {}", limit, scope);

        let spec = catalog::top_goal_scorers();
        let records = self.fetch(spec, limited_params(&scope, limit)).await?;
        let rows = shape(records, "top_goal_scorers", |r| {
            Ok(ScorerRow {
                player: r.text("player")?,
                team: r.text("team")?,
                goals: r.count("goals")?,
            })
        })?;

        Ok(ranking::top(rows, ranking::sort_scorers, limit))
    }

    pub async fn assist_leaders(
        &self,
        competition: &str,
        season: &str,
        limit: Option<usize>,
    ) -> StatsResult<Vec<AssistRow>> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let limit = self.resolve_limit(limit)?;
        info!("Fetching top {} assist leaders for {}", limit, scope);

        let records = self
            .fetch(catalog::assist_leaders(), limited_params(&scope, limit))
            .await?;
        let rows = shape(records, "assist_leaders", |r| {
            Ok(AssistRow {
                player: r.text("player")?,
                team: r.text("team")?,
                assists: r.count("assists")?,
            })
        })?;

        Ok(ranking::top(rows, ranking::sort_assists, limit))
    }

    pub async fn penalty_leaders(
        &self,
        competition: &str,
        season: &str,
        limit: Option<usize>,
    ) -> StatsResult<Vec<PenaltyRow>> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let limit = self.resolve_limit(limit)?;
        info!("Fetching top {} penalty leaders for {}", limit, scope);

        let records = self
            .fetch(catalog::penalty_leaders(), limited_params(&scope, limit))
            .await?;
        let rows = shape(records, "penalty_leaders", |r| {
            Ok(PenaltyRow {
                player: r.text("player")?,
                team: r.text("team")?,
                penalties: r.count("penalties")?,
                penalty_minutes: r.count("penalty_minutes")?,
            })
        })?;

        Ok(ranking::top(rows, ranking::sort_penalties, limit))
    }

    pub async fn team_standings(&self, competition: &str, season: &str) -> StatsResult<Vec<StandingRow>> {
        let scope = Scope::new(Some(competition), Some(season))?;
        info!("Fetching standings for {}", scope);

        let records = self.fetch(catalog::team_standings(), scope_params(&scope)).await?;
        let mut rows = shape(records, "team_standings", |r| {
            let team = r.text("team")?;
            standing_from(r, team)
        })?;

        ranking::sort_standings(&mut rows);
        Ok(rows)
    }

    /// One team's record; a team without games in scope gets a zeroed summary.
    pub async fn team_performance(
        &self,
        team_name: &str,
        competition: &str,
        season: &str,
    ) -> StatsResult<TeamPerformance> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let team = required("team", Some(team_name))?;
        info!("Fetching performance of {} in {}", team, scope);

        let mut params = scope_params(&scope);
        params.insert(PARAM_TEAM.to_string(), Value::String(team.clone()));

        let records = self.fetch(catalog::team_performance(), params).await?;
        let Some(record) = records.into_iter().next() else {
            return Ok(TeamPerformance::empty(&team));
        };

        let record = standing_from(&Row::new(&record, "team_performance"), team.clone())?;
        if record.games == 0 {
            debug!("{} has no games in {}", team, scope);
            return Ok(TeamPerformance::empty(&team));
        }
        Ok(TeamPerformance { record })
    }

    pub async fn recent_games(
        &self,
        competition: &str,
        season: &str,
        limit: Option<usize>,
    ) -> StatsResult<Vec<GameRow>> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let limit = self.resolve_limit(limit)?;
        info!("Fetching {} most recent games for {}", limit, scope);

        let records = self
            .fetch(catalog::recent_games(), limited_params(&scope, limit))
            .await?;
        let rows = shape(records, "recent_games", game_from)?;

        Ok(ranking::top(rows, ranking::sort_games, limit))
    }

    /// Attendance, scoring and outcome figures over every game in scope.
    pub async fn game_statistics(&self, competition: &str, season: &str) -> StatsResult<GameStatistics> {
        let scope = Scope::new(Some(competition), Some(season))?;
        info!("Fetching game statistics for {}", scope);

        let (game_records, result_records) = futures::try_join!(
            self.fetch(catalog::season_games(), scope_params(&scope)),
            self.fetch(catalog::result_breakdown(), scope_params(&scope))
        )?;

        let mut games = shape(game_records, "season_games", game_from)?;
        ranking::sort_games(&mut games);

        let mut counts: Vec<ResultCount> = GameResult::ALL
            .iter()
            .map(|&result| ResultCount { result, count: 0 })
            .collect();
        let mut unrecognized = 0;

        for record in &result_records {
            let row = Row::new(record, "result_breakdown");
            let code = row.optional_text("result")?;
            let edges = row.count("edges")?;

            match code.as_deref().and_then(GameResult::from_code) {
                Some(result) => {
                    if let Some(entry) = counts.iter_mut().find(|c| c.result == result) {
                        entry.count += edges;
                    }
                }
                None => {
                    warn!(
                        "{} game records in {} have unrecognized result code {:?}",
                        edges, scope, code
                    );
                    unrecognized += edges;
                }
            }
        }

        Ok(GameStatistics::from_games(&games, counts, unrecognized))
    }

    pub async fn competitions(&self) -> StatsResult<Vec<String>> {
        info!("Fetching competitions");
        let records = self.fetch(catalog::competitions(), Params::new()).await?;
        names(records, "competitions")
    }

    pub async fn seasons(&self, competition: &str) -> StatsResult<Vec<String>> {
        let competition = required("competition", Some(competition))?;
        info!("Fetching seasons of {}", competition);

        let mut params = Params::new();
        params.insert(PARAM_COMPETITION.to_string(), Value::String(competition));
        let records = self.fetch(catalog::seasons(), params).await?;
        names(records, "seasons")
    }

    pub async fn teams(&self) -> StatsResult<Vec<TeamInfo>> {
        info!("Fetching teams");
        let records = self.fetch(catalog::teams(), Params::new()).await?;
        let mut rows = shape(records, "teams", |r| {
            Ok(TeamInfo {
                name: r.text("name")?,
                short_name: r.optional_text("short_name")?,
            })
        })?;
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows.dedup();
        Ok(rows)
    }

    pub async fn league_summary(&self, competition: &str, season: &str) -> StatsResult<LeagueSummary> {
        let standings = self.team_standings(competition, season).await?;
        Ok(LeagueSummary::from_standings(&standings))
    }

    /// Standings, top scorers and recent games fetched concurrently.
    pub async fn dashboard(
        &self,
        competition: &str,
        season: &str,
        limit: Option<usize>,
    ) -> StatsResult<Dashboard> {
        let scope = Scope::new(Some(competition), Some(season))?;
        let limit = self.resolve_limit(limit)?;
        info!("Building dashboard for {}", scope);

        let (standings, top_scorers, recent_games) = futures::try_join!(
            self.team_standings(&scope.competition, &scope.season),
            self.top_goal_scorers(&scope.competition, &scope.season, Some(limit)),
            self.recent_games(&scope.competition, &scope.season, Some(limit))
        )?;

        Ok(Dashboard {
            summary: LeagueSummary::from_standings(&standings),
            standings,
            top_scorers,
            recent_games,
        })
    }

    /// Probe the data source; returns the number of competitions it holds.
    pub async fn health_check(&self) -> StatsResult<u64> {
        let records = self.fetch(catalog::health_check(), Params::new()).await?;
        match records.first() {
            Some(record) => Row::new(record, "health_check").count("competitions"),
            None => Ok(0),
        }
    }
}

fn scope_params(scope: &Scope) -> Params {
    let mut params = Params::new();
    params.insert(PARAM_COMPETITION.to_string(), Value::String(scope.competition.clone()));
    params.insert(PARAM_SEASON.to_string(), Value::String(scope.season.clone()));
    params
}

fn limited_params(scope: &Scope, limit: usize) -> Params {
    let mut params = scope_params(scope);
    params.insert(PARAM_LIMIT.to_string(), Value::from(limit as u64));
    params
}

fn standing_from(r: &Row<'_>, team: String) -> StatsResult<StandingRow> {
    Ok(StandingRow {
        team,
        games: r.count("games")?,
        wins: r.count("wins")?,
        losses: r.count("losses")?,
        ties: r.count("ties")?,
        overtime_wins: r.count("overtime_wins")?,
        overtime_losses: r.count("overtime_losses")?,
        goals_for: r.count("goals_for")?,
        goals_against: r.count("goals_against")?,
        points: r.count("points")?,
    })
}

fn game_from(r: &Row<'_>) -> StatsResult<GameRow> {
    Ok(GameRow {
        date: r.text("date")?,
        home_team: r.text("home_team")?,
        away_team: r.text("away_team")?,
        score: r.optional_text("score")?,
        spectators: r.optional_count("spectators")?,
    })
}

fn names(records: Vec<Record>, query: &str) -> StatsResult<Vec<String>> {
    let mut names = shape(records, query, |r| r.text("name"))?;
    names.sort();
    names.dedup();
    Ok(names)
}

fn shape<T>(
    records: Vec<Record>,
    query: &str,
    convert: impl Fn(&Row<'_>) -> StatsResult<T>,
) -> StatsResult<Vec<T>> {
    records
        .iter()
        .map(|record| convert(&Row::new(record, query)))
        .collect()
}

/// Typed field access on a record, reporting shape errors against the query.
struct Row<'a> {
    record: &'a Record,
    query: &'a str,
}

impl<'a> Row<'a> {
    fn new(record: &'a Record, query: &'a str) -> Self {
        Self { record, query }
    }

    fn malformed(&self, field: &str, expected: &str, value: &Value) -> StatsError {
        StatsError::MalformedRecord {
            query: self.query.to_string(),
            detail: format!("field '{}' should be {}, got {}", field, expected, value),
        }
    }

    fn text(&self, field: &str) -> StatsResult<String> {
        match self.record.get(field) {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.malformed(field, "a string", other)),
        }
    }

    fn optional_text(&self, field: &str) -> StatsResult<Option<String>> {
        match self.record.get(field) {
            Value::Null => Ok(None),
            Value::String(s) => Ok(Some(s.clone())),
            other => Err(self.malformed(field, "a string or null", other)),
        }
    }

    fn count(&self, field: &str) -> StatsResult<u64> {
        let value = self.record.get(field);
        as_count(value).ok_or_else(|| self.malformed(field, "a non-negative integer", value))
    }

    fn optional_count(&self, field: &str) -> StatsResult<Option<u64>> {
        match self.record.get(field) {
            Value::Null => Ok(None),
            value => as_count(value)
                .map(Some)
                .ok_or_else(|| self.malformed(field, "a non-negative integer or null", value)),
        }
    }
}

/// Integral numbers, including floats with no fractional part.
fn as_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::source::MemoryGraph;
    use crate::stats::fixtures::LeagueBuilder;
    use async_trait::async_trait;
    use serde_json::json;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SHL: &str = "SHL";
    const SEASON: &str = "2023/2024";

    fn service(graph: MemoryGraph) -> StatsService {
        StatsService::new(Arc::new(graph))
    }

    /// Source that counts calls and answers with a fixed outcome.
    struct ScriptedSource {
        calls: AtomicUsize,
        outcome: fn() -> Result<Vec<Record>, SourceError>,
    }

    impl ScriptedSource {
        fn new(outcome: fn() -> Result<Vec<Record>, SourceError>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DataSource for ScriptedSource {
        async fn execute(&self, _spec: &QuerySpec, _params: &Params) -> Result<Vec<Record>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }

        fn describe(&self) -> String {
            "scripted".to_string()
        }
    }

    /// Four scorers with 10, 8, 8 and 5 goals in one game.
    fn scoring_league() -> MemoryGraph {
        let mut league = LeagueBuilder::new();
        league
            .season(SHL, SEASON)
            .player("Max Friberg", "Färjestad BK")
            .player("Oskar Lang", "Rögle BK")
            .player("Anton Ek", "Växjö Lakers")
            .player("Linus Persson", "Rögle BK");
        let game = league.game("2023-11-04", "Färjestad BK", "Rögle BK", (15, 16), false);
        league
            .goals(&game, "Max Friberg", 10)
            .goals(&game, "Oskar Lang", 8)
            .goals(&game, "Anton Ek", 8)
            .goals(&game, "Linus Persson", 5);
        league.build()
    }

    /// A 3-team season plus a different competition sharing the season name.
    fn full_league() -> MemoryGraph {
        let mut league = LeagueBuilder::new();
        league
            .season(SHL, SEASON)
            .player("Erik Brännström", "Frölunda HC")
            .player("Jonas Ahnelöv", "Linköping HC")
            .player("Victor Ejdsell", "Luleå HF");
        let g1 = league.game("2023-10-01", "Frölunda HC", "Linköping HC", (5, 2), false);
        let g2 = league.game("2023-10-05", "Linköping HC", "Luleå HF", (3, 2), true);
        let g3 = league.game("2023-10-09", "Luleå HF", "Frölunda HC", (1, 1), false);
        league
            .goal(&g1, "Erik Brännström", &["Jonas Ahnelöv"])
            .goal(&g2, "Jonas Ahnelöv", &[])
            .goal(&g3, "Victor Ejdsell", &["Erik Brännström"])
            .penalty(&g1, "Jonas Ahnelöv", 2)
            .penalty(&g2, "Jonas Ahnelöv", 10)
            .penalty(&g2, "Victor Ejdsell", 2);

        league.season("HockeyAllsvenskan", SEASON);
        let other = league.game("2023-10-02", "AIK", "Modo Hockey", (4, 0), false);
        league.player("Filip Hasa", "AIK").goals(&other, "Filip Hasa", 3);
        league.build()
    }

    #[tokio::test]
    async fn test_top_scorers_with_tied_counts() {
        let stats = service(scoring_league());
        let rows = stats.top_goal_scorers(SHL, SEASON, Some(3)).await.unwrap();

        let goals: Vec<u64> = rows.iter().map(|r| r.goals).collect();
        assert_eq!(goals, vec![10, 8, 8]);
        assert_eq!(rows[1].player, "Anton Ek");
        assert_eq!(rows[2].player, "Oskar Lang");
        assert_eq!(rows[0].team, "Färjestad BK");
    }

    #[tokio::test]
    async fn test_limit_bounds_result_and_order_is_non_increasing() {
        let stats = service(scoring_league());
        for limit in 1..=5 {
            let rows = stats.top_goal_scorers(SHL, SEASON, Some(limit)).await.unwrap();
            assert!(rows.len() <= limit);
            assert!(rows.windows(2).all(|w| w[0].goals >= w[1].goals));
        }
    }

    #[tokio::test]
    async fn test_single_game_standings() {
        let mut league = LeagueBuilder::new();
        league.season(SHL, SEASON);
        league.game("2023-09-16", "A", "B", (5, 2), false);
        let stats = service(league.build());

        let rows = stats.team_standings(SHL, SEASON).await.unwrap();
        assert_eq!(rows.len(), 2);

        let a = &rows[0];
        assert_eq!((a.team.as_str(), a.games, a.wins, a.losses, a.points), ("A", 1, 1, 0, 3));
        assert_eq!((a.goals_for, a.goals_against), (5, 2));
        let b = &rows[1];
        assert_eq!((b.team.as_str(), b.games, b.wins, b.losses, b.points), ("B", 1, 0, 1, 0));
    }

    #[tokio::test]
    async fn test_standings_account_for_every_game_twice() {
        let stats = service(full_league());
        let rows = stats.team_standings(SHL, SEASON).await.unwrap();

        assert_eq!(rows.len(), 3);
        let outcomes: u64 = rows.iter().map(|r| r.wins + r.losses + r.ties).sum();
        assert_eq!(outcomes, 2 * 3);

        let linkoping = rows.iter().find(|r| r.team == "Linköping HC").unwrap();
        assert_eq!((linkoping.wins, linkoping.overtime_wins, linkoping.points), (1, 1, 2));
        let lulea = rows.iter().find(|r| r.team == "Luleå HF").unwrap();
        assert_eq!((lulea.losses, lulea.overtime_losses, lulea.ties, lulea.points), (1, 1, 1, 2));

        assert_eq!(rows[0].team, "Frölunda HC");
        assert!(!rows.iter().any(|r| r.team == "AIK"));
    }

    #[tokio::test]
    async fn test_assists_and_penalties() {
        let stats = service(full_league());

        let assists = stats.assist_leaders(SHL, SEASON, None).await.unwrap();
        let names: Vec<_> = assists.iter().map(|r| r.player.as_str()).collect();
        assert_eq!(names, vec!["Erik Brännström", "Jonas Ahnelöv"]);

        let penalties = stats.penalty_leaders(SHL, SEASON, None).await.unwrap();
        assert_eq!(penalties[0].player, "Jonas Ahnelöv");
        assert_eq!((penalties[0].penalties, penalties[0].penalty_minutes), (2, 12));
        assert_eq!(penalties[1].penalty_minutes, 2);
    }

    #[tokio::test]
    async fn test_team_performance() {
        let stats = service(full_league());

        let perf = stats.team_performance("Frölunda HC", SHL, SEASON).await.unwrap();
        assert!(perf.has_data());
        assert_eq!(perf.record.team, "Frölunda HC");
        assert_eq!((perf.record.games, perf.record.wins, perf.record.ties), (2, 1, 1));
        assert_eq!(perf.record.points, 4);

        let idle = stats.team_performance("AIK", SHL, SEASON).await.unwrap();
        assert_eq!(idle, TeamPerformance::empty("AIK"));
    }

    #[tokio::test]
    async fn test_empty_scope_yields_empty_results() {
        let stats = service(full_league());
        let season = "1999/2000";

        assert!(stats.top_goal_scorers(SHL, season, None).await.unwrap().is_empty());
        assert!(stats.assist_leaders(SHL, season, None).await.unwrap().is_empty());
        assert!(stats.penalty_leaders(SHL, season, None).await.unwrap().is_empty());
        assert!(stats.team_standings(SHL, season).await.unwrap().is_empty());
        assert!(stats.recent_games(SHL, season, None).await.unwrap().is_empty());
        assert!(!stats.team_performance("Frölunda HC", SHL, season).await.unwrap().has_data());
        assert_eq!(stats.league_summary(SHL, season).await.unwrap(), LeagueSummary::default());
        assert!(stats.seasons("KHL").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identical_scope_gives_identical_results() {
        let stats = service(full_league());
        let first = stats.dashboard(SHL, SEASON, Some(5)).await.unwrap();
        let second = stats.dashboard(SHL, SEASON, Some(5)).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_dashboard_combines_views() {
        let stats = service(full_league());
        let dashboard = stats.dashboard(SHL, SEASON, Some(2)).await.unwrap();

        assert_eq!(dashboard.summary.teams, 3);
        assert_eq!(dashboard.summary.games, 3);
        assert_eq!(dashboard.summary.goals, 14);
        assert_eq!(dashboard.standings.len(), 3);
        assert_eq!(dashboard.top_scorers.len(), 2);
        assert_eq!(dashboard.recent_games.len(), 2);
        assert_eq!(dashboard.recent_games[0].date, "2023-10-09");
        assert_eq!(dashboard.recent_games[0].score.as_deref(), Some("1-1"));
    }

    #[tokio::test]
    async fn test_game_statistics_cover_the_whole_season() {
        let stats = service(full_league());
        let games = stats.game_statistics(SHL, SEASON).await.unwrap();

        assert_eq!(games.games, 3);
        assert_eq!(games.first_game.map(|d| d.to_string()).as_deref(), Some("2023-10-01"));
        assert_eq!(games.last_game.map(|d| d.to_string()).as_deref(), Some("2023-10-09"));
        assert_eq!(games.total_attendance, 5100 + 5200 + 5300);
        assert_eq!(games.highest_attendance, Some(5300));
        assert_eq!(games.lowest_attendance, Some(5100));
        assert_eq!(games.average_attendance, Some(5200.0));

        assert_eq!(games.total_goals, 14);
        let highest = games.highest_scoring_game.as_ref().unwrap();
        assert_eq!(highest.score.as_deref(), Some("5-2"));

        assert_eq!(
            (games.regulation_games, games.overtime_games, games.tied_games),
            (1, 1, 1)
        );
        let counts: Vec<(GameResult, u64)> = games.results.iter().map(|r| (r.result, r.count)).collect();
        assert_eq!(
            counts,
            vec![
                (GameResult::Win, 1),
                (GameResult::OvertimeWin, 1),
                (GameResult::Tie, 2),
                (GameResult::OvertimeLoss, 1),
                (GameResult::Loss, 1),
            ]
        );
        assert_eq!(games.unrecognized_results, 0);

        // Not truncated by the leaderboard limit
        let narrow = stats.with_limits(1, 1).game_statistics(SHL, SEASON).await.unwrap();
        assert_eq!(narrow.games, 3);
    }

    #[tokio::test]
    async fn test_game_statistics_count_unknown_result_codes() {
        let source = ScriptedSource::new(|| {
            let record: Record = [
                ("date".to_string(), json!("2024-02-10")),
                ("home_team".to_string(), json!("HV 71")),
                ("away_team".to_string(), json!("Leksands IF")),
                ("score".to_string(), json!("3-2")),
                ("spectators".to_string(), json!(6850)),
                ("result".to_string(), json!("SOW")),
                ("edges".to_string(), json!(2)),
            ]
            .into_iter()
            .collect();
            Ok(vec![record])
        });

        let games = StatsService::new(source.clone())
            .game_statistics(SHL, SEASON)
            .await
            .unwrap();
        assert_eq!(source.calls(), 2);
        assert_eq!(games.games, 1);
        assert_eq!(games.unrecognized_results, 2);
        assert!(games.results.iter().all(|r| r.count == 0));
    }

    #[tokio::test]
    async fn test_directory_queries() {
        let stats = service(full_league());

        assert_eq!(stats.competitions().await.unwrap(), vec!["HockeyAllsvenskan", "SHL"]);
        assert_eq!(stats.seasons(SHL).await.unwrap(), vec![SEASON]);

        let teams = stats.teams().await.unwrap();
        assert_eq!(teams.len(), 5);
        assert_eq!(teams[0].name, "AIK");
        assert_eq!(teams[0].short_name.as_deref(), Some("AIK"));

        assert_eq!(stats.health_check().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_input_errors_never_reach_the_source() {
        let source = ScriptedSource::new(|| Ok(Vec::new()));
        let stats = StatsService::new(source.clone()).with_limits(10, 50);

        let errors = [
            stats.top_goal_scorers("", SEASON, None).await.unwrap_err(),
            stats.assist_leaders(SHL, "  ", None).await.unwrap_err(),
            stats.penalty_leaders(SHL, SEASON, Some(0)).await.unwrap_err(),
            stats.recent_games(SHL, SEASON, Some(51)).await.unwrap_err(),
            stats.team_performance(" ", SHL, SEASON).await.unwrap_err(),
            stats.team_standings(SHL, "").await.unwrap_err(),
            stats.seasons("").await.unwrap_err(),
            stats.dashboard(SHL, SEASON, Some(0)).await.unwrap_err(),
            stats.game_statistics(SHL, " ").await.unwrap_err(),
        ];

        assert!(errors.iter().all(StatsError::is_input_error));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_source_errors_propagate_unchanged() {
        let down = ScriptedSource::new(|| Err(SourceError::Unavailable("connection refused".into())));
        let err = StatsService::new(down.clone())
            .team_standings(SHL, SEASON)
            .await
            .unwrap_err();
        assert!(matches!(err, StatsError::Source(SourceError::Unavailable(_))));
        assert!(err.is_retryable());
        assert_eq!(down.calls(), 1);

        let slow = ScriptedSource::new(|| Err(SourceError::Timeout(30)));
        let err = StatsService::new(slow).dashboard(SHL, SEASON, None).await.unwrap_err();
        assert!(matches!(err, StatsError::Source(SourceError::Timeout(30))));

        let broken = ScriptedSource::new(|| Err(SourceError::Execution("syntax error".into())));
        let err = StatsService::new(broken).competitions().await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_records_are_reported() {
        let source = ScriptedSource::new(|| {
            let record: Record = [
                ("player".to_string(), json!("Erik Ek")),
                ("team".to_string(), json!("Luleå HF")),
                ("goals".to_string(), json!("many")),
            ]
            .into_iter()
            .collect();
            Ok(vec![record])
        });

        let err = StatsService::new(source)
            .top_goal_scorers(SHL, SEASON, None)
            .await
            .unwrap_err();
        match err {
            StatsError::MalformedRecord { query, detail } => {
                assert_eq!(query, "top_goal_scorers");
                assert!(detail.contains("goals"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_as_count_accepts_integral_floats() {
        assert_eq!(as_count(&json!(4)), Some(4));
        assert_eq!(as_count(&json!(4.0)), Some(4));
        assert_eq!(as_count(&json!(4.5)), None);
        assert_eq!(as_count(&json!(-1)), None);
        assert_eq!(as_count(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_sample_dataset() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/shl_sample.json");
        let stats = service(MemoryGraph::load(&path).unwrap());

        let seasons = stats.seasons(SHL).await.unwrap();
        assert_eq!(seasons, vec!["2023/2024", "2024/2025"]);

        for season in &seasons {
            let standings = stats.team_standings(SHL, season).await.unwrap();
            let summary = LeagueSummary::from_standings(&standings);
            let games = stats.recent_games(SHL, season, Some(100)).await.unwrap();
            assert_eq!(summary.games as usize, games.len());

            let outcomes: u64 = standings.iter().map(|r| r.wins + r.losses + r.ties).sum();
            assert_eq!(outcomes, 2 * summary.games);
            let scored: u64 = games.iter().filter_map(GameRow::total_goals).sum();
            assert_eq!(scored, summary.goals);

            let game_stats = stats.game_statistics(SHL, season).await.unwrap();
            assert_eq!(game_stats.games, summary.games);
            assert_eq!(game_stats.total_goals, summary.goals);
            assert_eq!(
                game_stats.regulation_games + game_stats.overtime_games + game_stats.tied_games,
                summary.games
            );
            assert_eq!(game_stats.unrecognized_results, 0);
        }
    }
}
