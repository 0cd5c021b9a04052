//! # Taskboard API Server Library
//!
//! HTTP surface for the taskboard service: users, their projects, and the
//! tasks inside each project, exposed as JSON CRUD endpoints.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
