//! Declarative query specifications.
//!
//! A [`QuerySpec`] describes a traversal (node and relationship patterns
//! with property filters bound to named parameters), the values to
//! return, how to order them and an optional limit. It carries no
//! execution logic: each data source interprets it, either by rendering
//! Cypher or by matching it against an in-memory graph.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Named query parameters (`$season`, `$limit`, ...).
pub type Params = BTreeMap<String, Value>;

/// A node in a traversal pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct NodePattern {
    /// Variable the matched node is bound to.
    pub var: &'static str,
    /// Required node label.
    pub label: &'static str,
    /// Property equality filters as `(property, parameter)` pairs.
    pub props: Vec<(&'static str, &'static str)>,
}

impl NodePattern {
    /// Require `property` to equal the value of parameter `param`.
    pub fn with(mut self, property: &'static str, param: &'static str) -> Self {
        self.props.push((property, param));
        self
    }
}

/// Shorthand for an unfiltered node pattern.
pub fn node(var: &'static str, label: &'static str) -> NodePattern {
    NodePattern {
        var,
        label,
        props: Vec::new(),
    }
}

/// One outgoing relationship step in a path.
#[derive(Debug, Clone, PartialEq)]
pub struct Hop {
    /// Variable for the relationship itself, when its properties are used.
    pub rel_var: Option<&'static str>,
    pub rel_type: &'static str,
    pub node: NodePattern,
}

/// A linear path: a start node followed by outgoing hops.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub hops: Vec<Hop>,
}

impl PathPattern {
    pub fn from(start: NodePattern) -> Self {
        Self {
            start,
            hops: Vec::new(),
        }
    }

    /// Extend the path with `-[:rel_type]->(node)`.
    pub fn to(mut self, rel_type: &'static str, node: NodePattern) -> Self {
        self.hops.push(Hop {
            rel_var: None,
            rel_type,
            node,
        });
        self
    }

    /// Extend the path with `-[rel_var:rel_type]->(node)`.
    pub fn to_via(mut self, rel_var: &'static str, rel_type: &'static str, node: NodePattern) -> Self {
        self.hops.push(Hop {
            rel_var: Some(rel_var),
            rel_type,
            node,
        });
        self
    }
}

/// A value computed per matched row or per group.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Property of a bound node or relationship.
    Property { var: &'static str, key: &'static str },
    Literal(Value),
    /// String concatenation; null if any part is null.
    Concat(Vec<Expr>),
    /// Number of matched rows in the group binding `var`.
    Count(&'static str),
    /// Sum over the group; missing values count as zero.
    Sum(Box<Expr>),
    /// Number of rows in the group whose expression is one of `values`.
    CountIn { expr: Box<Expr>, values: Vec<Value> },
}

impl Expr {
    /// Whether this expression aggregates over a group.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Expr::Count(_) | Expr::Sum(_) | Expr::CountIn { .. } => true,
            Expr::Concat(parts) => parts.iter().any(Expr::is_aggregate),
            Expr::Property { .. } | Expr::Literal(_) => false,
        }
    }

    fn to_cypher(&self) -> String {
        match self {
            Expr::Property { var, key } => format!("{}.{}", var, key),
            Expr::Literal(value) => cypher_literal(value),
            Expr::Concat(parts) => parts
                .iter()
                .map(Expr::to_cypher)
                .collect::<Vec<_>>()
                .join(" + "),
            Expr::Count(var) => format!("count({})", var),
            Expr::Sum(inner) => format!("sum({})", inner.to_cypher()),
            Expr::CountIn { expr, values } => format!(
                "sum(CASE WHEN {} IN [{}] THEN 1 ELSE 0 END)",
                expr.to_cypher(),
                values.iter().map(cypher_literal).collect::<Vec<_>>().join(", ")
            ),
        }
    }
}

/// Property access shorthand.
pub fn prop(var: &'static str, key: &'static str) -> Expr {
    Expr::Property { var, key }
}

/// String literal shorthand.
pub fn lit(s: &str) -> Expr {
    Expr::Literal(Value::String(s.to_string()))
}

fn cypher_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        other => other.to_string(),
    }
}

/// A returned column.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub alias: &'static str,
    pub expr: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKey {
    pub alias: &'static str,
    pub direction: Direction,
}

/// A complete, parameterized traversal and aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub name: &'static str,
    pub paths: Vec<PathPattern>,
    pub returns: Vec<ReturnItem>,
    pub order_by: Vec<OrderKey>,
    /// Parameter holding the row limit, if any.
    pub limit: Option<&'static str>,
}

impl QuerySpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            paths: Vec::new(),
            returns: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    pub fn matching(mut self, path: PathPattern) -> Self {
        self.paths.push(path);
        self
    }

    pub fn returning(mut self, alias: &'static str, expr: Expr) -> Self {
        self.returns.push(ReturnItem { alias, expr });
        self
    }

    pub fn order_by(mut self, alias: &'static str, direction: Direction) -> Self {
        self.order_by.push(OrderKey { alias, direction });
        self
    }

    pub fn limit(mut self, param: &'static str) -> Self {
        self.limit = Some(param);
        self
    }

    /// Whether any return item aggregates, making the others grouping keys.
    pub fn is_aggregating(&self) -> bool {
        self.returns.iter().any(|r| r.expr.is_aggregate())
    }

    /// All parameter names the spec needs, in first-use order.
    pub fn referenced_params(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let nodes = self
            .paths
            .iter()
            .flat_map(|p| std::iter::once(&p.start).chain(p.hops.iter().map(|h| &h.node)));

        for node in nodes {
            for (_, param) in &node.props {
                if !names.contains(param) {
                    names.push(*param);
                }
            }
        }
        if let Some(limit) = self.limit {
            if !names.contains(&limit) {
                names.push(limit);
            }
        }
        names
    }

    /// Parameters the spec needs that `params` does not provide.
    pub fn missing_params(&self, params: &Params) -> Vec<&'static str> {
        self.referenced_params()
            .into_iter()
            .filter(|name| !params.contains_key(*name))
            .collect()
    }

    /// Render the spec as a Cypher statement using `$param` placeholders.
    pub fn to_cypher(&self) -> String {
        let mut lines = Vec::new();
        let mut declared: Vec<&str> = Vec::new();

        for path in &self.paths {
            let mut line = String::from("MATCH ");
            line.push_str(&render_node(&path.start, &mut declared));
            for hop in &path.hops {
                match hop.rel_var {
                    Some(var) => line.push_str(&format!("-[{}:{}]->", var, hop.rel_type)),
                    None => line.push_str(&format!("-[:{}]->", hop.rel_type)),
                }
                line.push_str(&render_node(&hop.node, &mut declared));
            }
            lines.push(line);
        }

        let returns = self
            .returns
            .iter()
            .map(|r| format!("{} AS {}", r.expr.to_cypher(), r.alias))
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("RETURN {}", returns));

        if !self.order_by.is_empty() {
            let keys = self
                .order_by
                .iter()
                .map(|k| match k.direction {
                    Direction::Desc => format!("{} DESC", k.alias),
                    Direction::Asc => k.alias.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("ORDER BY {}", keys));
        }

        if let Some(limit) = self.limit {
            lines.push(format!("LIMIT ${}", limit));
        }

        lines.join("\n")
    }
}

/// Render a node, omitting label and filters once the variable is declared.
fn render_node<'a>(node: &'a NodePattern, declared: &mut Vec<&'a str>) -> String {
    if declared.contains(&node.var) {
        return format!("({})", node.var);
    }
    declared.push(node.var);

    if node.props.is_empty() {
        format!("({}:{})", node.var, node.label)
    } else {
        let filters = node
            .props
            .iter()
            .map(|(key, param)| format!("{}: ${}", key, param))
            .collect::<Vec<_>>()
            .join(", ");
        format!("({}:{} {{{}}})", node.var, node.label, filters)
    }
}
