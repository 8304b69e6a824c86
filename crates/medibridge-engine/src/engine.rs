//! # Engine Handle
//!
//! Holds what every command needs: the database, the clock and the config.
//!
//! ## Thread Safety
//! `Database` wraps a `SqlitePool` and the clock is an `Arc<dyn Clock>`, so
//! an `Engine` is cheap to clone and safe to share across tasks. Commands
//! keep no state between calls.
//!
//! ## Usage
//! ```rust,ignore
//! let engine = Engine::open(EngineConfig::load(None)?).await?;
//! let request = engine.create_request(CreateRequest { .. }).await?;
//! ```

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

use medibridge_core::{Clock, Page, SystemClock};
use medibridge_db::Database;

use crate::config::EngineConfig;
use crate::error::EngineResult;

/// Entry point for all commands.
#[derive(Debug, Clone)]
pub struct Engine {
    db: Database,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl Engine {
    /// Wraps an open database.
    pub fn new(db: Database, clock: Arc<dyn Clock>, config: EngineConfig) -> Self {
        Engine { db, clock, config }
    }

    /// Opens the configured database with the system clock.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    /// Opens the configured database with an explicit clock.
    pub async fn open_with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        info!(path = ?config.database.path, "Engine ready");
        Ok(Engine::new(db, clock, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Current instant from the injected clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Current date from the injected clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Resolves caller paging against the configured default limit.
    pub(crate) fn page(&self, limit: Option<i64>, offset: Option<i64>) -> Page {
        Page::resolve(limit, offset, self.config.listing.default_page_limit)
    }

    /// Closes the pool.
    pub async fn close(&self) {
        self.db.close().await;
    }
}
