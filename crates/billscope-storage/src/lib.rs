//! SQLite persistence for the bill tracker: schema management, bill and
//! sub-entity operations, and a content-addressed document cache.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tracing::{info, warn};

pub mod bills;
pub mod cache;
pub mod schema;

pub use bills::{
    ActionRow, BillListing, BillRow, CommitteeRow, SponsorRow, TextVersionRow,
};
pub use cache::DocumentCache;

pub const CRATE_NAME: &str = "billscope-storage";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("serializing column value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("creating database directory {path}: {source}")]
    CreateDir {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (or create) the database file at `path`.
    pub async fn connect(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests.
    pub async fn open_in_memory() -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::new().in_memory(true);
        // A single connection: each in-memory connection is its own database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create all tables in dependency order and run additive migrations.
    /// Table creation failures are fatal; index and migration failures are
    /// logged and skipped so a partially healthy database stays usable.
    pub async fn init_schema(&self) -> Result<(), StorageError> {
        for table in schema::TABLES {
            sqlx::query(table.create).execute(&self.pool).await?;

            for index in table.indexes {
                if let Err(err) = sqlx::query(index).execute(&self.pool).await {
                    warn!(table = table.name, error = %err, "failed to create index");
                }
            }

            for migration in table.migrations {
                match self.column_exists(migration.table, migration.column).await {
                    Ok(true) => {}
                    Ok(false) => match sqlx::query(migration.alter).execute(&self.pool).await {
                        Ok(_) => info!(migration = migration.name, "applied schema migration"),
                        Err(err) => {
                            warn!(migration = migration.name, error = %err, "migration failed")
                        }
                    },
                    Err(err) => {
                        warn!(migration = migration.name, error = %err, "migration check failed")
                    }
                }
            }
        }
        Ok(())
    }

    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM pragma_table_info(?1) WHERE name = ?2")
            .bind(table)
            .bind(column)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }
}
