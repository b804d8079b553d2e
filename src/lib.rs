//! grano-ql - object queries over an entity graph
//!
//! Clients describe the nested JSON they want back; the engine fills it in
//! from a relational store of entities, relations and typed properties:
//! - an immutable entity type registry ([`graph_catalog`])
//! - query normalization and per-level execution ([`query_planner`])
//! - SQL generation ([`sql_builder`]) over a SQLite store ([`store`])
//! - an HTTP surface ([`server`])

pub mod config;
pub mod graph_catalog;
pub mod query_planner;
pub mod server;
pub mod sql_builder;
pub mod store;
