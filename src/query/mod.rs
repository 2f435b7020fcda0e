//! Query specifications and the catalog of statistics traversals.

pub mod catalog;
pub mod spec;

pub use spec::{Direction, Expr, Params, QuerySpec};
