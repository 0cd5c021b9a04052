/// Schema migrations
///
/// The SQL files under `migrations/` are embedded at compile time. Each
/// migration is a reversible pair:
/// - `{timestamp}_{name}.up.sql` creates enum types, tables and indexes
/// - `{timestamp}_{name}.down.sql` drops them again
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::db::migrations::{get_migration_status, run_migrations};
/// use taskboard_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig::for_url(std::env::var("DATABASE_URL")?)).await?;
///
///     run_migrations(&pool).await?;
///
///     let status = get_migration_status(&pool).await?;
///     assert!(status.is_up_to_date);
///     Ok(())
/// }
/// ```

use sqlx::{
    migrate::{MigrateDatabase, Migrator},
    postgres::PgPool,
    Postgres,
};
use tracing::{debug, info, warn};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Where the schema stands relative to the embedded migrations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Successfully applied migrations
    pub applied_migrations: usize,

    /// Highest applied version
    pub latest_version: Option<i64>,

    /// Highest version shipped with this build
    pub expected_version: Option<i64>,

    /// Whether the applied version matches the shipped one
    pub is_up_to_date: bool,
}

/// Highest migration version embedded in the binary
pub fn embedded_version() -> Option<i64> {
    MIGRATOR
        .iter()
        .filter(|migration| !migration.migration_type.is_down_migration())
        .map(|migration| migration.version)
        .max()
}

/// Applies every pending migration
///
/// # Errors
///
/// Returns the migrator error if a migration fails or a previously applied
/// one was edited.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!(target_version = ?embedded_version(), "Running database migrations");

    MIGRATOR.run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        e
    })?;

    info!("Database schema is up to date");
    Ok(())
}

/// Reads the migration bookkeeping table
///
/// A database that was never migrated reports zero applied migrations.
///
/// # Errors
///
/// Returns an error if the bookkeeping table cannot be queried.
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    let expected_version = embedded_version();

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            expected_version,
            is_up_to_date: expected_version.is_none(),
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    debug!(applied_migrations = count, latest_version = ?latest_version, "Migration status retrieved");

    Ok(MigrationStatus {
        applied_migrations: usize::try_from(count).unwrap_or_default(),
        latest_version,
        expected_version,
        is_up_to_date: latest_version == expected_version,
    })
}

/// Creates the database named in `database_url` if it is missing
///
/// # Errors
///
/// Returns an error if the server is unreachable or the role may not
/// create databases.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        debug!("Database already exists");
    } else {
        info!("Creating database");
        Postgres::create_database(database_url).await?;
    }

    Ok(())
}

/// Drops the database named in `database_url`, if present
///
/// Meant for throwaway test databases; all data is lost.
///
/// # Errors
///
/// Returns an error if the server is unreachable or the database is still in
/// use.
pub async fn drop_database(database_url: &str) -> Result<(), sqlx::Error> {
    if Postgres::database_exists(database_url).await? {
        warn!("Dropping database");
        Postgres::drop_database(database_url).await?;
    }

    Ok(())
}
