use log::info;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{Sqlite, Transaction};
use std::path::Path;
use std::time::Duration;

use crate::constants::EXPECTED_DB_VERSION;
use crate::queries::{ddl, metadata};

type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Open a file-based connection pool for production use
/// Enables WAL mode and foreign keys, creates the file if missing
pub async fn open_database(
    db_path: &Path,
    max_connections: u32,
    busy_timeout: Duration,
) -> Result<SqlitePool, DynError> {
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(busy_timeout);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(|e| format!("Failed to open database '{}': {}", db_path.display(), e))?;

    info!("SQLite database: {}", db_path.display());
    Ok(pool)
}

/// Begin a transaction holding the write lock from the start (`BEGIN IMMEDIATE`)
/// Every read-then-write transaction must use this; a deferred one gets
/// SQLITE_BUSY on upgrade without consulting the busy timeout
pub async fn begin_write(pool: &SqlitePool) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
    pool.begin_with("BEGIN IMMEDIATE").await
}

/// Initialize database schema
/// Creates tables and indexes if missing, then stamps or checks the schema version
pub async fn init_database_schema(pool: &SqlitePool) -> Result<(), DynError> {
    let mut tx = begin_write(pool).await?;

    for sql in [
        ddl::create_metadata_table(),
        ddl::create_segments_table(),
        ddl::create_memberships_table(),
        ddl::create_operation_history_table(),
        ddl::create_scheduled_removals_table(),
        ddl::create_memberships_segment_id_index(),
        ddl::create_operation_history_stamp_index(),
    ] {
        sqlx::query(&sql).execute(&mut *tx).await?;
    }

    let version: Option<String> = sqlx::query_scalar(&metadata::select_by_key("version"))
        .fetch_optional(&mut *tx)
        .await?;

    match version {
        None => {
            sqlx::query(&metadata::insert("version", EXPECTED_DB_VERSION))
                .execute(&mut *tx)
                .await?;
        }
        Some(v) if v == EXPECTED_DB_VERSION => {}
        Some(v) => {
            return Err(format!(
                "Unsupported database version: '{}'. This application only supports version '{}'",
                v, EXPECTED_DB_VERSION
            )
            .into());
        }
    }

    tx.commit().await?;
    Ok(())
}

/// Create a pool on a fresh database file inside a temporary directory
/// Returns (pool, guard) - keep the guard alive or the directory is removed
pub async fn create_test_connection_in_temporary_file(
) -> Result<(SqlitePool, tempfile::TempDir), DynError> {
    let temp_dir = tempfile::tempdir()?;
    let db_path = temp_dir.path().join("test.sqlite");
    let pool = open_database(&db_path, 5, Duration::from_secs(5)).await?;
    Ok((pool, temp_dir))
}
