//! hockey-stats - league statistics from a hockey graph database
//!
//! A CLI front end for the statistics layer: picks a scope, runs one
//! view against Neo4j or a JSON graph snapshot and writes a Markdown or
//! JSON report.
//!
//! Exit codes:
//!   0 - Success (including empty results)
//!   1 - Runtime error (data source unavailable, timeout, bad config, etc.)
//!   2 - Input error (missing season, invalid limit, no data source, etc.)

use anyhow::{Context, Result};
use chrono::Utc;
use hockey_stats::cli::{Args, OutputFormat, View};
use hockey_stats::config::{Config, SourceSelection, DEFAULT_CONFIG_FILE};
use hockey_stats::models::{Report, ReportBody, ReportMetadata, Scope};
use hockey_stats::query::{catalog, Params, QuerySpec};
use hockey_stats::source::{DataSource, MemoryGraph, Neo4jSource};
use hockey_stats::{report, StatsError, StatsResult, StatsService};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

const EXIT_RUNTIME: i32 = 1;
const EXIT_INPUT: i32 = 2;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(EXIT_INPUT);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let loaded = load_config(&args);
    let verbose = loaded
        .as_ref()
        .map(|(config, _)| config.general.verbose)
        .unwrap_or(false);

    // Initialize logging
    init_logging(&args, verbose);

    info!("hockey-stats v{}", env!("CARGO_PKG_VERSION"));
    debug!("View: {:?}", args.view);
    if args.limit.is_some() && !args.view.uses_limit() {
        warn!("--limit has no effect on the {:?} view", args.view);
    }

    let config = match loaded {
        Ok((config, origin)) => {
            origin.log();
            config
        }
        Err(e) => {
            error!("Configuration error: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(EXIT_RUNTIME);
        }
    };

    match run(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            let code = exit_code_for(&e);
            error!("Query failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            if let Some(stats) = e.downcast_ref::<StatsError>() {
                if stats.is_retryable() {
                    eprintln!("   The data source may be temporarily unavailable; try again later.");
                }
            }
            std::process::exit(code);
        }
    }
}

/// Input errors exit with 2, everything else with 1.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<StatsError>() {
        Some(e) if e.is_input_error() => EXIT_INPUT,
        _ => EXIT_RUNTIME,
    }
}

/// Handle --init-config: generate a default .hockeystats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(EXIT_RUNTIME);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Set a season and a data source (dataset or neo4j_url) to get started.");
    Ok(())
}

/// Initialize logging based on verbosity settings; `RUST_LOG` overrides them.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = if !args.quiet && config_verbose {
        tracing::Level::DEBUG
    } else {
        args.log_level()
    };
    let filter = EnvFilter::new(log_directives(level, std::env::var("RUST_LOG").ok()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn log_directives(level: tracing::Level, rust_log: Option<String>) -> String {
    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .unwrap_or_else(|| level.as_str().to_lowercase())
}

/// Where the configuration came from, logged once logging is up.
enum ConfigOrigin {
    Explicit(PathBuf),
    DefaultFile,
    Builtin,
    Fallback(String),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::Explicit(path) => info!("Loaded config from: {}", path.display()),
            ConfigOrigin::DefaultFile => info!("Loaded default config from {}", DEFAULT_CONFIG_FILE),
            ConfigOrigin::Builtin => debug!("No config file found, using defaults"),
            ConfigOrigin::Fallback(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    let (mut config, origin) = if let Some(ref config_path) = args.config {
        // An explicit path must load
        (Config::load(config_path)?, ConfigOrigin::Explicit(config_path.clone()))
    } else {
        match Config::load_default() {
            Ok(Some(config)) => (config, ConfigOrigin::DefaultFile),
            Ok(None) => (Config::default(), ConfigOrigin::Builtin),
            Err(e) => (Config::default(), ConfigOrigin::Fallback(format!("{:#}", e))),
        }
    };

    config.merge_with_args(args);
    config.validate()?;
    Ok((config, origin))
}

/// What the user asked for, after config defaults are applied.
struct Selection {
    view: View,
    competition: String,
    season: Option<String>,
    team: Option<String>,
    limit: Option<usize>,
}

impl Selection {
    fn new(args: &Args, config: &Config) -> Self {
        Self {
            view: args.view,
            competition: config.queries.competition.clone(),
            season: config.queries.season.clone(),
            team: args.team.clone(),
            limit: args.limit,
        }
    }

    /// Competition and season, for season-scoped views.
    fn scope(&self) -> StatsResult<Scope> {
        Scope::new(Some(self.competition.as_str()), self.season.as_deref())
    }
}

/// Run the selected view. Returns the exit code.
async fn run(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();
    let format = config.output_format()?;
    let selection = Selection::new(&args, &config);

    // Handle --dry-run: print the queries and exit
    if args.dry_run {
        return handle_dry_run(&selection, &config);
    }

    let Some(choice) = config.source_selection() else {
        eprintln!("Error: no data source configured. Use --data <FILE> or --neo4j-url <URL>.");
        return Ok(EXIT_INPUT);
    };

    let remote = matches!(choice, SourceSelection::Neo4j(_));
    let source = open_source(choice)?;
    let service = StatsService::new(source)
        .with_limits(config.queries.default_limit, config.queries.max_limit);

    let progress = if remote && !args.quiet {
        Some(spinner(format!("Querying {}...", service.source_description())))
    } else {
        None
    };

    let outcome: StatsResult<ReportBody> = async {
        let competitions = service.health_check().await?;
        debug!("Data source holds {} competitions", competitions);
        run_view(&service, &selection).await
    }
    .await;

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let body = outcome?;
    info!("{:?} view returned {} rows", selection.view, body.row_count());

    let metadata = ReportMetadata {
        competition: match selection.view {
            View::Competitions | View::Teams => None,
            _ => Some(selection.competition.clone()),
        },
        season: if selection.view.needs_season() {
            selection.season.clone()
        } else {
            None
        },
        source: service.source_description(),
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report { metadata, body };

    let output = match format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    match config.general.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                println!("✅ Report saved to: {}", path.display());
            }
        }
        None => print!("{}", output),
    }

    Ok(0)
}

async fn run_view(service: &StatsService, selection: &Selection) -> StatsResult<ReportBody> {
    let limit = selection.limit;

    let body = match selection.view {
        View::Dashboard => {
            let scope = selection.scope()?;
            ReportBody::Dashboard(service.dashboard(&scope.competition, &scope.season, limit).await?)
        }
        View::Standings => {
            let scope = selection.scope()?;
            ReportBody::Standings(service.team_standings(&scope.competition, &scope.season).await?)
        }
        View::Scorers => {
            let scope = selection.scope()?;
            ReportBody::Scorers(service.top_goal_scorers(&scope.competition, &scope.season, limit).await?)
        }
        View::Assists => {
            let scope = selection.scope()?;
            ReportBody::Assists(service.assist_leaders(&scope.competition, &scope.season, limit).await?)
        }
        View::Penalties => {
            let scope = selection.scope()?;
            ReportBody::Penalties(service.penalty_leaders(&scope.competition, &scope.season, limit).await?)
        }
        View::Team => {
            let scope = selection.scope()?;
            let team = selection.team.as_deref().unwrap_or_default();
            ReportBody::Team(service.team_performance(team, &scope.competition, &scope.season).await?)
        }
        View::Games => {
            let scope = selection.scope()?;
            ReportBody::Games(service.recent_games(&scope.competition, &scope.season, limit).await?)
        }
        View::GameStats => {
            let scope = selection.scope()?;
            ReportBody::GameStats(service.game_statistics(&scope.competition, &scope.season).await?)
        }
        View::Competitions => ReportBody::Competitions(service.competitions().await?),
        View::Seasons => ReportBody::Seasons(service.seasons(&selection.competition).await?),
        View::Teams => ReportBody::Teams(service.teams().await?),
    };

    Ok(body)
}

fn open_source(choice: SourceSelection) -> Result<Arc<dyn DataSource>> {
    match choice {
        SourceSelection::Neo4j(neo4j) => Ok(Arc::new(Neo4jSource::new(neo4j)?)),
        SourceSelection::Dataset(path) => {
            let graph = MemoryGraph::load(&path)
                .with_context(|| format!("Failed to open dataset {}", path.display()))?;
            Ok(Arc::new(graph))
        }
    }
}

fn spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// The queries a view issues, in execution order.
fn view_queries(view: View) -> Vec<QuerySpec> {
    match view {
        View::Dashboard => vec![
            catalog::team_standings(),
            catalog::top_goal_scorers(),
            catalog::recent_games(),
        ],
        View::Standings => vec![catalog::team_standings()],
        View::Scorers => vec![catalog::top_goal_scorers()],
        View::Assists => vec![catalog::assist_leaders()],
        View::Penalties => vec![catalog::penalty_leaders()],
        View::Team => vec![catalog::team_performance()],
        View::Games => vec![catalog::recent_games()],
        View::GameStats => vec![catalog::season_games(), catalog::result_breakdown()],
        View::Competitions => vec![catalog::competitions()],
        View::Seasons => vec![catalog::seasons()],
        View::Teams => vec![catalog::teams()],
    }
}

/// Handle --dry-run: print the Cypher and parameters without querying.
fn handle_dry_run(selection: &Selection, config: &Config) -> Result<i32> {
    let mut params = Params::new();
    params.insert(catalog::PARAM_COMPETITION.to_string(), Value::from(selection.competition.clone()));
    if let Some(ref season) = selection.season {
        params.insert(catalog::PARAM_SEASON.to_string(), Value::from(season.clone()));
    }
    if let Some(ref team) = selection.team {
        params.insert(catalog::PARAM_TEAM.to_string(), Value::from(team.clone()));
    }
    let limit = selection.limit.unwrap_or(config.queries.default_limit);
    params.insert(catalog::PARAM_LIMIT.to_string(), Value::from(limit as u64));

    println!("🔍 Dry run: {:?} view (no data source calls)\n", selection.view);

    for spec in view_queries(selection.view) {
        let used: Params = spec
            .referenced_params()
            .into_iter()
            .filter_map(|name| params.get(name).map(|v| (name.to_string(), v.clone())))
            .collect();

        println!("// {}", spec.name);
        println!("{}", spec.to_cypher());
        println!("// parameters: {}", Value::Object(used.into_iter().collect()));
        for missing in spec.missing_params(&params) {
            println!("// ⚠️  ${} is not set", missing);
        }
        println!();
    }

    Ok(0)
}
