//! Markdown and JSON report generation.
//!
//! This module renders one view's result set, plus run metadata, as a
//! Markdown document or pretty-printed JSON.

use crate::models::{
    AssistRow, Dashboard, GameRow, GameStatistics, LeagueSummary, PenaltyRow, Report, ReportBody, ReportMetadata,
    ScorerRow, StandingRow, TeamInfo, TeamPerformance,
};
use anyhow::Result;

const NO_RESULTS: &str = "_No results for this scope._\n\n";

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", title(&report.body)));
    output.push_str(&generate_metadata_section(&report.metadata));

    match &report.body {
        ReportBody::Dashboard(dashboard) => output.push_str(&generate_dashboard(dashboard)),
        ReportBody::Standings(rows) => output.push_str(&standings_table(rows)),
        ReportBody::Scorers(rows) => output.push_str(&scorers_table(rows)),
        ReportBody::Assists(rows) => output.push_str(&assists_table(rows)),
        ReportBody::Penalties(rows) => output.push_str(&penalties_table(rows)),
        ReportBody::Team(perf) => output.push_str(&team_section(perf)),
        ReportBody::Games(rows) => output.push_str(&games_table(rows)),
        ReportBody::GameStats(stats) => output.push_str(&game_statistics_section(stats)),
        ReportBody::Competitions(names) | ReportBody::Seasons(names) => output.push_str(&name_list(names)),
        ReportBody::Teams(rows) => output.push_str(&teams_table(rows)),
    }

    output.push_str(&generate_footer());
    output
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

fn title(body: &ReportBody) -> &'static str {
    match body {
        ReportBody::Dashboard(_) => "League Dashboard",
        ReportBody::Standings(_) => "Standings",
        ReportBody::Scorers(_) => "Top Goal Scorers",
        ReportBody::Assists(_) => "Assist Leaders",
        ReportBody::Penalties(_) => "Penalty Leaders",
        ReportBody::Team(_) => "Team Performance",
        ReportBody::Games(_) => "Recent Games",
        ReportBody::GameStats(_) => "Game Statistics",
        ReportBody::Competitions(_) => "Competitions",
        ReportBody::Seasons(_) => "Seasons",
        ReportBody::Teams(_) => "Teams",
    }
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    if let Some(ref competition) = metadata.competition {
        section.push_str(&format!("- **Competition:** {}\n", competition));
    }
    if let Some(ref season) = metadata.season {
        section.push_str(&format!("- **Season:** {}\n", season));
    }
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Query Duration:** {:.2}s\n\n", metadata.duration_seconds));

    section
}

fn generate_dashboard(dashboard: &Dashboard) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&summary_table(&dashboard.summary));

    section.push_str("## Standings\n\n");
    section.push_str(&standings_table(&dashboard.standings));

    section.push_str("## Top Scorers\n\n");
    section.push_str(&scorers_table(&dashboard.top_scorers));

    section.push_str("## Recent Games\n\n");
    section.push_str(&games_table(&dashboard.recent_games));

    section
}

fn summary_table(summary: &LeagueSummary) -> String {
    let mut table = String::new();

    table.push_str("| Teams | Games | Goals | Goals/Game |\n");
    table.push_str("|:---:|:---:|:---:|:---:|\n");
    table.push_str(&format!(
        "| {} | {} | {} | {:.2} |\n\n",
        summary.teams, summary.games, summary.goals, summary.average_goals_per_game,
    ));

    table
}

/// Escape text for a Markdown table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|")
}

fn standings_table(rows: &[StandingRow]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut table = String::new();
    table.push_str("| # | Team | GP | W | L | T | OTW | OTL | GF | GA | +/- | Pts |\n");
    table.push_str("|---:|:---|---:|---:|---:|---:|---:|---:|---:|---:|---:|---:|\n");

    for (i, row) in rows.iter().enumerate() {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} | {} | {} | {} | {} | {:+} | **{}** |\n",
            i + 1,
            cell(&row.team),
            row.games,
            row.wins,
            row.losses,
            row.ties,
            row.overtime_wins,
            row.overtime_losses,
            row.goals_for,
            row.goals_against,
            row.goal_difference(),
            row.points
        ));
    }
    table.push('\n');

    table
}

fn leader_table(count_header: &str, rows: Vec<(&str, &str, String)>) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut table = String::new();
    table.push_str(&format!("| # | Player | Team | {} |\n", count_header));
    table.push_str("|---:|:---|:---|---:|\n");

    for (i, (player, team, count)) in rows.iter().enumerate() {
        table.push_str(&format!("| {} | {} | {} | {} |\n", i + 1, cell(player), cell(team), count));
    }
    table.push('\n');

    table
}

fn scorers_table(rows: &[ScorerRow]) -> String {
    leader_table(
        "Goals",
        rows.iter()
            .map(|r| (r.player.as_str(), r.team.as_str(), r.goals.to_string()))
            .collect(),
    )
}

fn assists_table(rows: &[AssistRow]) -> String {
    leader_table(
        "Assists",
        rows.iter()
            .map(|r| (r.player.as_str(), r.team.as_str(), r.assists.to_string()))
            .collect(),
    )
}

fn penalties_table(rows: &[PenaltyRow]) -> String {
    leader_table(
        "Penalties (PIM)",
        rows.iter()
            .map(|r| {
                (
                    r.player.as_str(),
                    r.team.as_str(),
                    format!("{} ({})", r.penalties, r.penalty_minutes),
                )
            })
            .collect(),
    )
}

fn team_section(perf: &TeamPerformance) -> String {
    let record = &perf.record;
    let mut section = format!("## {}\n\n", record.team);

    if !perf.has_data() {
        section.push_str("_No games played in this scope._\n\n");
        return section;
    }

    section.push_str(&format!("- **Games Played:** {}\n", perf.games_played()));
    section.push_str(&format!(
        "- **Record (W-L-T):** {}-{}-{}\n",
        record.wins, record.losses, record.ties
    ));
    section.push_str(&format!(
        "- **Overtime (W-L):** {}-{}\n",
        record.overtime_wins, record.overtime_losses
    ));
    section.push_str(&format!(
        "- **Goals:** {} for, {} against ({:+})\n",
        record.goals_for,
        record.goals_against,
        record.goal_difference()
    ));
    section.push_str(&format!("- **Points:** {}\n", record.points));
    section.push_str(&format!("- **Points per Game:** {:.2}\n", record.points_per_game()));
    section.push_str(&format!("- **Win Percentage:** {:.1}%\n\n", record.win_percentage()));

    section
}

fn games_table(rows: &[GameRow]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut table = String::new();
    table.push_str("| Date | Home | Score | Away | Spectators |\n");
    table.push_str("|:---|:---|:---:|:---|---:|\n");

    for game in rows {
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            cell(&game.date),
            cell(&game.home_team),
            cell(game.score.as_deref().unwrap_or("-")),
            cell(&game.away_team),
            game.spectators.map_or_else(|| "-".to_string(), |s| s.to_string()),
        ));
    }
    table.push('\n');

    table
}

fn game_statistics_section(stats: &GameStatistics) -> String {
    if stats.games == 0 {
        return NO_RESULTS.to_string();
    }

    let count = |value: Option<u64>| value.map_or_else(|| "-".to_string(), |v| v.to_string());
    let mut section = String::new();

    if let (Some(first), Some(last)) = (stats.first_game, stats.last_game) {
        section.push_str(&format!("- **Played:** {} to {}\n", first, last));
    }
    section.push_str(&format!("- **Games:** {}\n\n", stats.games));

    section.push_str("## Attendance\n\n");
    section.push_str(&format!("- **Total:** {}\n", stats.total_attendance));
    section.push_str(&format!(
        "- **Average:** {}\n",
        stats
            .average_attendance
            .map_or_else(|| "-".to_string(), |a| format!("{:.0}", a))
    ));
    section.push_str(&format!("- **Highest:** {}\n", count(stats.highest_attendance)));
    section.push_str(&format!("- **Lowest:** {}\n\n", count(stats.lowest_attendance)));

    section.push_str("## Scoring\n\n");
    section.push_str(&format!("- **Total Goals:** {}\n", stats.total_goals));
    section.push_str(&format!("- **Goals per Game:** {:.2}\n", stats.average_goals_per_game));
    if let Some(ref game) = stats.highest_scoring_game {
        section.push_str(&format!(
            "- **Highest Scoring Game:** {} {} {} ({})\n",
            game.home_team,
            game.score.as_deref().unwrap_or("-"),
            game.away_team,
            game.date
        ));
    }
    section.push('\n');

    section.push_str("## Outcomes\n\n");
    section.push_str(&format!("- **Decided in Regulation:** {}\n", stats.regulation_games));
    section.push_str(&format!("- **Decided in Overtime:** {}\n", stats.overtime_games));
    section.push_str(&format!("- **Tied:** {}\n\n", stats.tied_games));

    section.push_str("| Result | Team Games |\n");
    section.push_str("|:---|---:|\n");
    for result in &stats.results {
        section.push_str(&format!("| {} ({}) | {} |\n", result.result, result.result.code(), result.count));
    }
    if stats.unrecognized_results > 0 {
        section.push_str(&format!("| Unrecognized | {} |\n", stats.unrecognized_results));
    }
    section.push('\n');

    section
}

fn name_list(names: &[String]) -> String {
    if names.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut list = String::new();
    for name in names {
        list.push_str(&format!("- {}\n", name));
    }
    list.push('\n');

    list
}

fn teams_table(rows: &[TeamInfo]) -> String {
    if rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    let mut table = String::new();
    table.push_str("| Team | Short Name |\n");
    table.push_str("|:---|:---|\n");
    for team in rows {
        table.push_str(&format!(
            "| {} | {} |\n",
            cell(&team.name),
            cell(team.short_name.as_deref().unwrap_or("-"))
        ));
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!("---\n\n*Generated by hockey-stats v{}*\n", env!("CARGO_PKG_VERSION"))
}
