//! Embedded schema migrations.
//!
//! `migrations/sqlite/` at the workspace root is compiled into the binary;
//! sqlx tracks applied versions in `_sqlx_migrations` and refuses to start
//! if an applied file's checksum changed. Schema changes go in a new
//! `NNN_description.sql` file.
//!
//! ```text
//!   001_initial_schema.sql
//!     dealers ─┬─< product_batches
//!              ├─< transfer_requests (requesting / responding) >── product_batches
//!              └─< invoices (seller / buyer) ── 1:1 ── transfer_requests
//!                     └─< payments
//! ```

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies whatever embedded migrations the database has not seen yet.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(
        versions = MIGRATOR.migrations.len(),
        "Ledger schema up to date"
    );
    Ok(())
}

/// Returns `(embedded, applied)` migration counts for diagnostics.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;

    Ok((total, applied as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_schema_is_current_after_open() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (total, applied) = migration_status(db.pool()).await.unwrap();
        assert!(total >= 1);
        assert_eq!(total, applied);

        db.run_migrations().await.unwrap();
        assert_eq!(migration_status(db.pool()).await.unwrap().1, applied);
    }
}
