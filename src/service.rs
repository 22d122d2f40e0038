//! The service handle: one explicitly opened store, one clock, one scheduler.

use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::config::ServiceConfig;
use crate::db;
use crate::error::Result;
use crate::history::{self, HistoryRecord};
use crate::membership;
use crate::registry;
use crate::schedule::Scheduler;

type DynError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Clone)]
pub struct SegmentService {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
}

impl SegmentService {
    /// Open the configured database and bring the service up
    pub async fn open(config: &ServiceConfig) -> std::result::Result<Self, DynError> {
        let pool = db::open_database(
            &config.database_path,
            config.max_connections,
            Duration::from_millis(config.busy_timeout_ms),
        )
        .await?;
        Self::with_pool(pool, Arc::new(SystemClock)).await
    }

    /// Initialize the schema on `pool` and recover pending removals
    ///
    /// Overdue removals have been executed by the time this returns.
    pub async fn with_pool(
        pool: SqlitePool,
        clock: Arc<dyn Clock>,
    ) -> std::result::Result<Self, DynError> {
        db::init_database_schema(&pool).await?;
        let scheduler = Scheduler::start(pool.clone(), clock.clone()).await?;
        Ok(Self {
            pool,
            clock,
            scheduler,
        })
    }

    pub async fn create_segment(&self, name: &str, percent: i64) -> Result<()> {
        registry::create_segment(&self.pool, self.clock.as_ref(), name, percent).await
    }

    pub async fn delete_segment(&self, name: &str) -> Result<()> {
        registry::delete_segment(&self.pool, name).await
    }

    pub async fn update_user(
        &self,
        user_id: i64,
        add: &[String],
        remove: &[String],
        ttl_secs: u64,
    ) -> Result<()> {
        membership::update_user(
            &self.pool,
            self.clock.as_ref(),
            &self.scheduler,
            user_id,
            add,
            remove,
            ttl_secs,
        )
        .await
    }

    pub async fn get_segments(&self, user_id: i64) -> Result<Vec<String>> {
        membership::get_segments(&self.pool, user_id).await
    }

    pub async fn get_history(&self, year: i32, month: u32) -> Result<Vec<HistoryRecord>> {
        history::get_history(&self.pool, year, month).await
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the store; pending removals stay in the table for the next start
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
