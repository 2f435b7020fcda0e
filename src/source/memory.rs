//! In-memory property graph.
//!
//! Loads a JSON snapshot of nodes and relationships and executes query
//! specifications by pattern matching, with the same grouping, ordering
//! and null semantics a Cypher engine applies to the rendered statement.

use super::{ensure_params, DataSource, Record};
use crate::error::SourceError;
use crate::query::spec::{Direction, Expr, NodePattern, PathPattern};
use crate::query::{Params, QuerySpec};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// A node as stored in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeData {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// A directed relationship as stored in a snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipData {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Serialized form of a graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub relationships: Vec<RelationshipData>,
}

impl GraphSnapshot {
    /// Add a node; `properties` should be a JSON object.
    pub fn add_node(&mut self, id: &str, label: &str, properties: Value) -> &mut Self {
        self.nodes.push(NodeData {
            id: id.to_string(),
            label: label.to_string(),
            properties: into_map(properties),
        });
        self
    }

    /// Add a relationship `(start)-[rel_type]->(end)`.
    pub fn add_rel(&mut self, rel_type: &str, start: &str, end: &str, properties: Value) -> &mut Self {
        self.relationships.push(RelationshipData {
            rel_type: rel_type.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            properties: into_map(properties),
        });
        self
    }
}

fn into_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

#[derive(Debug)]
struct Relationship {
    end: usize,
    properties: Map<String, Value>,
}

/// Variable bindings of one partial match.
type Binding = HashMap<&'static str, Bound>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Node(usize),
    Rel(usize),
}

/// Immutable, indexed graph that answers [`QuerySpec`]s.
#[derive(Debug)]
pub struct MemoryGraph {
    nodes: Vec<NodeData>,
    rels: Vec<Relationship>,
    by_label: HashMap<String, Vec<usize>>,
    /// Per node: relationship type -> outgoing relationship indices.
    outgoing: Vec<HashMap<String, Vec<usize>>>,
    origin: String,
}

impl MemoryGraph {
    /// Load a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graph snapshot: {}", path.display()))?;

        let snapshot: GraphSnapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse graph snapshot: {}", path.display()))?;

        let graph = Self::from_snapshot(snapshot, path.display().to_string())?;
        info!(
            "Loaded graph with {} nodes and {} relationships from {}",
            graph.node_count(),
            graph.relationship_count(),
            path.display()
        );
        Ok(graph)
    }

    /// Build an indexed graph, rejecting duplicate ids and dangling edges.
    pub fn from_snapshot(snapshot: GraphSnapshot, origin: impl Into<String>) -> Result<Self> {
        let mut index: HashMap<String, usize> = HashMap::new();
        let mut by_label: HashMap<String, Vec<usize>> = HashMap::new();

        for (i, node) in snapshot.nodes.iter().enumerate() {
            if index.insert(node.id.clone(), i).is_some() {
                bail!("Duplicate node id '{}'", node.id);
            }
            by_label.entry(node.label.clone()).or_default().push(i);
        }

        let mut outgoing: Vec<HashMap<String, Vec<usize>>> = vec![HashMap::new(); snapshot.nodes.len()];
        let mut rels = Vec::with_capacity(snapshot.relationships.len());

        for rel in snapshot.relationships {
            let start = *index
                .get(&rel.start)
                .with_context(|| format!("{} relationship starts at unknown node '{}'", rel.rel_type, rel.start))?;
            let end = *index
                .get(&rel.end)
                .with_context(|| format!("{} relationship ends at unknown node '{}'", rel.rel_type, rel.end))?;

            outgoing[start].entry(rel.rel_type).or_default().push(rels.len());
            rels.push(Relationship {
                end,
                properties: rel.properties,
            });
        }

        Ok(Self {
            nodes: snapshot.nodes,
            rels,
            by_label,
            outgoing,
            origin: origin.into(),
        })
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn relationship_count(&self) -> usize {
        self.rels.len()
    }

    /// Run a spec synchronously.
    pub fn run(&self, spec: &QuerySpec, params: &Params) -> Result<Vec<Record>, SourceError> {
        ensure_params(spec, params)?;

        let mut rows = vec![Binding::new()];
        for path in &spec.paths {
            let mut next = Vec::new();
            for row in &rows {
                self.extend_path(path, params, row, &mut next);
            }
            rows = next;
            if rows.is_empty() {
                break;
            }
        }
        debug!("{}: {} matched rows", spec.name, rows.len());

        let mut records = if spec.is_aggregating() {
            self.aggregate(spec, &rows)
        } else {
            rows.iter()
                .map(|row| {
                    spec.returns
                        .iter()
                        .map(|r| (r.alias.to_string(), self.eval(&r.expr, row)))
                        .collect::<Record>()
                })
                .collect()
        };

        if !spec.order_by.is_empty() {
            records.sort_by(|a, b| {
                spec.order_by
                    .iter()
                    .map(|key| order_values(a.get(key.alias), b.get(key.alias), key.direction))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        if let Some(param) = spec.limit {
            let limit = params
                .get(param)
                .and_then(Value::as_u64)
                .ok_or_else(|| SourceError::Execution(format!("${} must be a non-negative integer", param)))?;
            records.truncate(limit as usize);
        }

        Ok(records)
    }

    /// Extend `row` with every match of `path`, appending to `out`.
    fn extend_path(&self, path: &PathPattern, params: &Params, row: &Binding, out: &mut Vec<Binding>) {
        let candidates: Vec<usize> = match row.get(path.start.var) {
            Some(Bound::Node(idx)) => vec![*idx],
            Some(Bound::Rel(_)) => return,
            None => self.by_label.get(path.start.label).cloned().unwrap_or_default(),
        };

        for idx in candidates {
            if !self.node_matches(idx, &path.start, params) {
                continue;
            }
            let mut binding = row.clone();
            binding.insert(path.start.var, Bound::Node(idx));
            self.walk(path, 0, idx, binding, params, out);
        }
    }

    fn walk(
        &self,
        path: &PathPattern,
        hop_index: usize,
        current: usize,
        binding: Binding,
        params: &Params,
        out: &mut Vec<Binding>,
    ) {
        let Some(hop) = path.hops.get(hop_index) else {
            out.push(binding);
            return;
        };
        let Some(rel_ids) = self.outgoing[current].get(hop.rel_type) else {
            return;
        };

        for &rel_id in rel_ids {
            let end = self.rels[rel_id].end;
            match binding.get(hop.node.var) {
                Some(Bound::Node(bound)) if *bound != end => continue,
                Some(Bound::Rel(_)) => continue,
                _ => {}
            }
            if let Some(var) = hop.rel_var {
                if matches!(binding.get(var), Some(b) if *b != Bound::Rel(rel_id)) {
                    continue;
                }
            }
            if !self.node_matches(end, &hop.node, params) {
                continue;
            }

            let mut next = binding.clone();
            next.insert(hop.node.var, Bound::Node(end));
            if let Some(var) = hop.rel_var {
                next.insert(var, Bound::Rel(rel_id));
            }
            self.walk(path, hop_index + 1, end, next, params, out);
        }
    }

    fn node_matches(&self, idx: usize, pattern: &NodePattern, params: &Params) -> bool {
        let node = &self.nodes[idx];
        node.label == pattern.label
            && pattern.props.iter().all(|(key, param)| {
                match (node.properties.get(*key), params.get(*param)) {
                    (Some(actual), Some(expected)) => actual == expected,
                    _ => false,
                }
            })
    }

    fn property(&self, bound: Option<&Bound>, key: &str) -> Value {
        let props = match bound {
            Some(Bound::Node(i)) => &self.nodes[*i].properties,
            Some(Bound::Rel(i)) => &self.rels[*i].properties,
            None => return Value::Null,
        };
        props.get(key).cloned().unwrap_or(Value::Null)
    }

    /// Evaluate a non-aggregating expression against one row.
    fn eval(&self, expr: &Expr, row: &Binding) -> Value {
        match expr {
            Expr::Property { var, key } => self.property(row.get(var), key),
            Expr::Literal(value) => value.clone(),
            Expr::Concat(parts) => concat(parts.iter().map(|p| self.eval(p, row))),
            Expr::Count(_) | Expr::Sum(_) | Expr::CountIn { .. } => self.eval_group(expr, std::slice::from_ref(row)),
        }
    }

    /// Evaluate an expression over a group of rows.
    fn eval_group(&self, expr: &Expr, rows: &[Binding]) -> Value {
        match expr {
            Expr::Count(var) => Value::from(rows.iter().filter(|r| r.contains_key(var)).count()),
            Expr::Sum(inner) => sum(rows.iter().map(|r| self.eval(inner, r))),
            Expr::CountIn { expr, values } => {
                Value::from(rows.iter().filter(|r| values.contains(&self.eval(expr, r))).count())
            }
            Expr::Concat(parts) => concat(parts.iter().map(|p| self.eval_group(p, rows))),
            Expr::Literal(value) => value.clone(),
            Expr::Property { .. } => rows.first().map(|r| self.eval(expr, r)).unwrap_or(Value::Null),
        }
    }

    /// Group by the non-aggregating return items, preserving first-seen order.
    fn aggregate(&self, spec: &QuerySpec, rows: &[Binding]) -> Vec<Record> {
        let keys: Vec<&Expr> = spec
            .returns
            .iter()
            .map(|r| &r.expr)
            .filter(|e| !e.is_aggregate())
            .collect();

        let mut groups: Vec<Vec<Binding>> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for row in rows {
            let key = Value::Array(keys.iter().map(|k| self.eval(k, row)).collect()).to_string();
            let pos = *positions.entry(key).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[pos].push(row.clone());
        }

        // Without grouping keys an aggregation yields one row even when nothing matched.
        if groups.is_empty() && keys.is_empty() {
            groups.push(Vec::new());
        }

        groups
            .iter()
            .map(|group| {
                spec.returns
                    .iter()
                    .map(|r| (r.alias.to_string(), self.eval_group(&r.expr, group)))
                    .collect::<Record>()
            })
            .collect()
    }
}

fn concat(parts: impl Iterator<Item = Value>) -> Value {
    let mut out = String::new();
    for part in parts {
        match part {
            Value::Null => return Value::Null,
            Value::String(s) => out.push_str(&s),
            other => out.push_str(&other.to_string()),
        }
    }
    Value::String(out)
}

/// Numeric sum; integers stay integers unless a float is seen or the
/// integer total overflows.
fn sum(values: impl Iterator<Item = Value>) -> Value {
    let mut int_total: Option<i64> = Some(0);
    let mut float_total: f64 = 0.0;
    let mut saw_float = false;

    for value in values {
        if let Some(i) = value.as_i64() {
            int_total = int_total.and_then(|total| total.checked_add(i));
            float_total += i as f64;
        } else if let Some(f) = value.as_f64() {
            saw_float = true;
            float_total += f;
        }
    }

    match int_total {
        Some(total) if !saw_float => Value::from(total),
        _ => Value::from(float_total),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Object(_) => 0,
        Value::Array(_) => 1,
        Value::String(_) => 2,
        Value::Bool(_) => 3,
        Value::Number(_) => 4,
        Value::Null => 5,
    }
}

/// Total order over non-null values of the same type.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => {
                let x = x.as_f64().unwrap_or(f64::NAN);
                let y = y.as_f64().unwrap_or(f64::NAN);
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
        },
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Cypher ordering: nulls sort last ascending and first descending.
fn order_values(a: &Value, b: &Value, direction: Direction) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => match direction {
            Direction::Asc => Ordering::Greater,
            Direction::Desc => Ordering::Less,
        },
        (false, true) => match direction {
            Direction::Asc => Ordering::Less,
            Direction::Desc => Ordering::Greater,
        },
        (false, false) => match direction {
            Direction::Asc => compare_values(a, b),
            Direction::Desc => compare_values(a, b).reverse(),
        },
    }
}

#[async_trait]
impl DataSource for MemoryGraph {
    async fn execute(&self, spec: &QuerySpec, params: &Params) -> Result<Vec<Record>, SourceError> {
        self.run(spec, params)
    }

    fn describe(&self) -> String {
        format!(
            "in-memory graph {} ({} nodes, {} relationships)",
            self.origin,
            self.node_count(),
            self.relationship_count()
        )
    }
}
