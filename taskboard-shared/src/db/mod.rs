/// Database plumbing
///
/// - `pool`: connection pool construction, health checks and shutdown
/// - `migrations`: the embedded schema migrations and their status
///
/// Queries live with the PostgreSQL repositories in
/// [`crate::repositories::postgres`].

pub mod migrations;
pub mod pool;
