//! hockey-stats: league statistics over a hockey graph database.
//!
//! The [`stats::StatsService`] runs a fixed catalog of parameterized
//! traversals ([`query::catalog`]) against a [`source::DataSource`] and
//! returns ranked, typed result rows. Two sources are provided: a Neo4j
//! HTTP client and an in-memory graph loaded from a JSON snapshot.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod query;
pub mod report;
pub mod source;
pub mod stats;

pub use error::{SourceError, StatsError, StatsResult};
pub use stats::StatsService;
