//! flow-reports - a safe multi-dialect read-only query engine with result caching.
//!
//! The library exposes the engine for the `flow-reports` binary and for
//! integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod query;
pub mod safety;
