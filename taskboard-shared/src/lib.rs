//! # Taskboard Shared Library
//!
//! Domain model and use cases for the taskboard service: users own
//! projects, projects own tasks. The HTTP server in `taskboard-api` is a
//! thin layer over the handlers defined here.
//!
//! ## Module Organization
//!
//! - `models`: entities, their status enums and sortable fields
//! - `validation`: aggregated field errors and the custom field rules
//! - `ordering`: order specifications, paging and `Paginated` results
//! - `repositories`: persistence traits with PostgreSQL and in-memory stores
//! - `handlers`: create/update/delete/get/list for each aggregate
//! - `auth`: password hashing and strength policy
//! - `db`: connection pool and schema migrations

pub mod auth;
pub mod db;
pub mod handlers;
pub mod models;
pub mod ordering;
pub mod repositories;
pub mod validation;

/// Current version of the taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
