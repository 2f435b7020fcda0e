//! Neo4j data source over the HTTP transactional endpoint.
//!
//! Query specs are rendered to Cypher and posted to
//! `{url}/db/{database}/tx/commit` in a single auto-committed transaction.

use super::{ensure_params, DataSource, Record};
use crate::error::SourceError;
use crate::query::{Params, QuerySpec};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

/// Connection settings for a Neo4j server.
#[derive(Debug, Clone)]
pub struct Neo4jConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            user: "neo4j".to_string(),
            password: None,
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Serialize)]
struct TxRequest<'a> {
    statements: Vec<Statement<'a>>,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    statement: String,
    parameters: &'a Params,
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<TxResult>,
    #[serde(default)]
    errors: Vec<TxError>,
}

#[derive(Debug, Deserialize)]
struct TxResult {
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<TxRow>,
}

#[derive(Debug, Deserialize)]
struct TxRow {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct TxError {
    code: String,
    message: String,
}

/// Data source backed by a Neo4j server.
pub struct Neo4jSource {
    config: Neo4jConfig,
    http_client: reqwest::Client,
}

impl Neo4jSource {
    pub fn new(config: Neo4jConfig) -> Result<Self> {
        info!("Using Neo4j at {} (database {})", config.url, config.database);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { config, http_client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/db/{}/tx/commit",
            self.config.url.trim_end_matches('/'),
            self.config.database
        )
    }
}

#[async_trait]
impl DataSource for Neo4jSource {
    async fn execute(&self, spec: &QuerySpec, params: &Params) -> Result<Vec<Record>, SourceError> {
        ensure_params(spec, params)?;

        let statement = spec.to_cypher();
        debug!("{} cypher:\n{}", spec.name, statement);
        debug!("{} parameters: {:?}", spec.name, params);

        let request = TxRequest {
            statements: vec![Statement {
                statement,
                parameters: params,
            }],
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .basic_auth(&self.config.user, self.config.password.as_deref())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SourceError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    SourceError::Unavailable(format!("Cannot connect to Neo4j at {}", self.config.url))
                } else {
                    SourceError::Unavailable(format!("Failed to send request: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &self.config.user, &body));
        }

        let body: TxResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::Timeout(self.config.timeout_seconds)
            } else {
                SourceError::Execution(format!("Failed to parse Neo4j response: {}", e))
            }
        })?;

        records_from_response(body)
    }

    fn describe(&self) -> String {
        format!("neo4j {} (database {})", self.config.url, self.config.database)
    }
}

/// Map a non-2xx response. Only gateway and overload statuses count as the
/// server being unavailable; everything else is a failed request.
fn status_error(status: reqwest::StatusCode, user: &str, body: &str) -> SourceError {
    use reqwest::StatusCode;

    match status {
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            SourceError::Unavailable(format!("Neo4j returned {}", status))
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SourceError::Execution(format!("Neo4j rejected credentials for user {} ({})", user, status))
        }
        _ => SourceError::Execution(format!("Neo4j error {}: {}", status, body.trim())),
    }
}

/// Turn the column/row payload of the first statement into records.
fn records_from_response(response: TxResponse) -> Result<Vec<Record>, SourceError> {
    if let Some(err) = response.errors.first() {
        return Err(SourceError::Execution(format!("{}: {}", err.code, err.message)));
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    result
        .data
        .into_iter()
        .map(|row| {
            if row.row.len() != result.columns.len() {
                return Err(SourceError::Execution(format!(
                    "row has {} values for {} columns",
                    row.row.len(),
                    result.columns.len()
                )));
            }
            Ok(result.columns.iter().cloned().zip(row.row).collect())
        })
        .collect()
}
