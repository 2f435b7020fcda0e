//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.hockeystats.toml` files.

use crate::cli::{Args, OutputFormat};
use crate::source::Neo4jConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".hockeystats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Data source settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Query defaults.
    #[serde(default)]
    pub queries: QueriesConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Report file path; stdout when unset.
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Report format: "markdown" or "json".
    #[serde(default = "default_format")]
    pub format: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: None,
            format: default_format(),
            verbose: false,
        }
    }
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Where statistics are read from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// JSON graph snapshot, used when no Neo4j URL is set.
    #[serde(default)]
    pub dataset: Option<PathBuf>,

    /// Neo4j HTTP endpoint.
    #[serde(default)]
    pub neo4j_url: Option<String>,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub password: Option<String>,

    /// Query timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            neo4j_url: None,
            database: default_database(),
            user: default_user(),
            password: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_database() -> String {
    "neo4j".to_string()
}

fn default_user() -> String {
    "neo4j".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Default scope and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueriesConfig {
    #[serde(default = "default_competition")]
    pub competition: String,

    /// Season used when --season is not given.
    #[serde(default)]
    pub season: Option<String>,

    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for QueriesConfig {
    fn default() -> Self {
        Self {
            competition: default_competition(),
            season: None,
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_competition() -> String {
    "SHL".to_string()
}

fn default_limit() -> usize {
    10
}

fn default_max_limit() -> usize {
    100
}

/// The data source a run should use.
#[derive(Debug, Clone)]
pub enum SourceSelection {
    Neo4j(Neo4jConfig),
    Dataset(PathBuf),
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    /// Check values that would otherwise fail every query later.
    pub fn validate(&self) -> Result<()> {
        let queries = &self.queries;
        if queries.max_limit == 0 {
            bail!("queries.max_limit must be at least 1");
        }
        if queries.default_limit == 0 || queries.default_limit > queries.max_limit {
            bail!(
                "queries.default_limit must be between 1 and max_limit ({}), got {}",
                queries.max_limit,
                queries.default_limit
            );
        }
        if self.source.timeout_seconds == 0 {
            bail!("source.timeout_seconds must be at least 1");
        }
        Ok(())
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_if_exists(Path::new(DEFAULT_CONFIG_FILE))
    }

    fn load_if_exists(path: &Path) -> Result<Option<Self>> {
        if path.exists() {
            Ok(Some(Self::load(path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &Args) {
        if let Some(ref competition) = args.competition {
            self.queries.competition = competition.clone();
        }
        if let Some(ref season) = args.season {
            self.queries.season = Some(season.clone());
        }

        if let Some(ref data) = args.data {
            self.source.dataset = Some(data.clone());
        }
        if let Some(ref url) = args.neo4j_url {
            self.source.neo4j_url = Some(url.clone());
        }
        if let Some(ref user) = args.neo4j_user {
            self.source.user = user.clone();
        }
        if let Some(ref password) = args.neo4j_password {
            self.source.password = Some(password.clone());
        }
        if let Some(ref database) = args.database {
            self.source.database = database.clone();
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }
        if let Some(format) = args.format {
            self.general.format = match format {
                OutputFormat::Markdown => "markdown",
                OutputFormat::Json => "json",
            }
            .to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// The configured report format.
    pub fn output_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_name(&self.general.format)
            .with_context(|| format!("Unknown report format '{}'", self.general.format))
    }

    /// Pick the data source: Neo4j when a URL is configured, else the dataset.
    pub fn source_selection(&self) -> Option<SourceSelection> {
        if let Some(ref url) = self.source.neo4j_url {
            return Some(SourceSelection::Neo4j(Neo4jConfig {
                url: url.clone(),
                database: self.source.database.clone(),
                user: self.source.user.clone(),
                password: self.source.password.clone(),
                timeout_seconds: self.source.timeout_seconds,
            }));
        }
        self.source.dataset.clone().map(SourceSelection::Dataset)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
