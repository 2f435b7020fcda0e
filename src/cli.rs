//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// hockey-stats - league statistics from a hockey graph database
///
/// Computes standings, leaderboards and team summaries for one
/// competition season, from a Neo4j server or a JSON graph snapshot.
///
/// Examples:
///   hockey-stats --data fixtures/shl_sample.json -s 2024/2025
///   hockey-stats --neo4j-url http://localhost:7474 -s 2024/2025 --view scorers -l 20
///   hockey-stats --data shl.json -s 2023/2024 --view team -t "Frölunda HC" --format json
///   hockey-stats --data shl.json -s 2024/2025 --view game-stats
///   hockey-stats --view standings -s 2024/2025 --dry-run
///   hockey-stats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Which statistics view to produce
    #[arg(long, default_value = "dashboard", value_name = "VIEW")]
    pub view: View,

    /// Competition name (e.g. SHL)
    ///
    /// Defaults to the competition in .hockeystats.toml, or SHL.
    #[arg(short, long, value_name = "NAME")]
    pub competition: Option<String>,

    /// Season name (e.g. 2024/2025)
    #[arg(short, long, value_name = "NAME")]
    pub season: Option<String>,

    /// Maximum rows for leaderboards and game lists
    #[arg(short, long, value_name = "COUNT")]
    pub limit: Option<usize>,

    /// Team name for the team view
    #[arg(short, long, value_name = "NAME")]
    pub team: Option<String>,

    /// JSON graph snapshot to query instead of a Neo4j server
    #[arg(long, value_name = "FILE", env = "HOCKEYSTATS_DATA")]
    pub data: Option<PathBuf>,

    /// Neo4j HTTP endpoint URL
    #[arg(long, value_name = "URL", env = "NEO4J_URL")]
    pub neo4j_url: Option<String>,

    /// Neo4j user name
    #[arg(long, value_name = "USER", env = "NEO4J_USER")]
    pub neo4j_user: Option<String>,

    /// Neo4j password
    #[arg(long, value_name = "PASSWORD", env = "NEO4J_PASSWORD", hide_env_values = true)]
    pub neo4j_password: Option<String>,

    /// Neo4j database name
    #[arg(long, value_name = "NAME")]
    pub database: Option<String>,

    /// Output file path for the report
    ///
    /// The report is printed to stdout when no path is given.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .hockeystats.toml in the current directory
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Query timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Print the Cypher for the selected view without querying
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .hockeystats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Statistics view selected with --view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum View {
    /// Summary, standings, top scorers and recent games
    #[default]
    Dashboard,
    Standings,
    Scorers,
    Assists,
    Penalties,
    /// One team's record (requires --team)
    Team,
    Games,
    /// Attendance, scoring and outcome figures over the whole season
    GameStats,
    Competitions,
    /// Seasons of the competition
    Seasons,
    Teams,
}

impl View {
    /// Whether the view is scoped to one season.
    pub fn needs_season(&self) -> bool {
        !matches!(self, View::Competitions | View::Seasons | View::Teams)
    }

    /// Whether the view takes a row limit.
    pub fn uses_limit(&self) -> bool {
        matches!(
            self,
            View::Dashboard | View::Scorers | View::Assists | View::Penalties | View::Games
        )
    }
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name as written in the config file.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "markdown" | "md" => Some(OutputFormat::Markdown),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    ///
    /// Scope checks that depend on the config file happen later, in the
    /// statistics layer.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.view == View::Team && self.team.as_deref().map_or(true, |t| t.trim().is_empty()) {
            return Err("--view team requires --team <NAME>".to_string());
        }

        if self.limit == Some(0) {
            return Err("Limit must be at least 1".to_string());
        }

        // Validate Neo4j URL format (not needed for dry-run)
        if !self.dry_run {
            if let Some(ref url) = self.neo4j_url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Neo4j URL must start with 'http://' or 'https://'".to_string());
                }
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate dataset if provided
        if let Some(ref data) = self.data {
            if !data.is_file() {
                return Err(format!("Dataset file does not exist: {}", data.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
