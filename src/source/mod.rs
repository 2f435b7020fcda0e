//! Data source collaborators.
//!
//! A data source executes a [`QuerySpec`] with named parameters and
//! returns flat records. The statistics layer only depends on this trait,
//! so the backing store can be a Neo4j server or an in-memory snapshot.

pub mod memory;
pub mod neo4j;

use crate::error::SourceError;
use crate::query::{Params, QuerySpec};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub use memory::MemoryGraph;
pub use neo4j::{Neo4jConfig, Neo4jSource};

/// One flat result row keyed by return alias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, alias: impl Into<String>, value: Value) {
        self.fields.insert(alias.into(), value);
    }

    /// Value under `alias`; absent fields read as null.
    pub fn get(&self, alias: &str) -> &Value {
        self.fields.get(alias).unwrap_or(&Value::Null)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Executes query specifications against a graph.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Run `spec` bound to `params`.
    ///
    /// Implementations must refuse to run when a referenced parameter is
    /// missing rather than run the query partially scoped.
    async fn execute(&self, spec: &QuerySpec, params: &Params) -> Result<Vec<Record>, SourceError>;

    /// Short human-readable description, used in logs and reports.
    fn describe(&self) -> String;
}

/// Reject `spec` if `params` lacks anything it references.
pub(crate) fn ensure_params(spec: &QuerySpec, params: &Params) -> Result<(), SourceError> {
    match spec.missing_params(params).first() {
        Some(name) => Err(SourceError::MissingParameter(name.to_string())),
        None => Ok(()),
    }
}
