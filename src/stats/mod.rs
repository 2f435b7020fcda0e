//! The aggregation layer: scope validation, query execution, result
//! shaping and ranking.

#[cfg(test)]
pub(crate) mod fixtures;
pub mod ranking;
mod service;

pub use service::{StatsService, DEFAULT_LIMIT, MAX_LIMIT};
