//! Delayed removal scheduler.
//!
//! The `scheduled_removals` table is authoritative; the timers here only
//! mirror it. Each pending row gets one tokio task that sleeps until the
//! eta and then pushes the pair into a single queue. One worker drains the
//! queue, so removal transactions run one at a time in firing order.
//!
//! On startup every row is read back: rows already due are executed before
//! `Scheduler::start` returns, the rest get fresh timers. A failed execution
//! is logged and its row stays behind for the next startup.

use log::{debug, error, info, warn};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::db::begin_write;
use crate::error::Result;
use crate::history::{append_record, Operation};
use crate::queries::{memberships, removals};

/// A pending "remove user from segment" obligation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalTask {
    pub user_id: i64,
    pub segment_id: i64,
    pub eta_ms: i64,
}

#[derive(Clone)]
pub struct Scheduler {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    queue: mpsc::UnboundedSender<RemovalTask>,
}

impl Scheduler {
    /// Recover pending removals and start the execution worker
    ///
    /// Past-due rows are executed inline, so by the time this returns the
    /// store holds only removals that are still in the future.
    pub async fn start(pool: SqlitePool, clock: Arc<dyn Clock>) -> Result<Self> {
        let rows: Vec<(i64, i64, i64)> = sqlx::query_as(&removals::select_all())
            .fetch_all(&pool)
            .await?;
        info!("Found {} scheduled removals", rows.len());

        let now_ms = clock.now().timestamp_millis();
        let mut later = Vec::new();
        for (eta_ms, user_id, segment_id) in rows {
            let task = RemovalTask {
                user_id,
                segment_id,
                eta_ms,
            };
            if eta_ms <= now_ms {
                if let Err(e) = execute_removal(&pool, clock.as_ref(), user_id, segment_id).await {
                    error!(
                        "Failed overdue removal of user {} from segment {}: {}",
                        user_id,
                        segment_id,
                        e.detail()
                    );
                }
            } else {
                later.push(task);
            }
        }

        let (queue, receiver) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(pool.clone(), clock.clone(), receiver));

        let scheduler = Self { pool, clock, queue };
        scheduler.arm_all(later);
        Ok(scheduler)
    }

    /// Persist removals of `user_id` from `segment_ids` in `ttl_secs` and arm timers
    ///
    /// Pairs that already have a pending removal keep their earlier eta.
    /// Returns how many removals were newly planned.
    pub async fn schedule(&self, user_id: i64, segment_ids: &[i64], ttl_secs: u64) -> Result<usize> {
        let ttl_ms = i64::try_from(ttl_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        let eta_ms = self.clock.now().timestamp_millis().saturating_add(ttl_ms);

        let mut tx = begin_write(&self.pool).await?;
        let planned = persist_removals(&mut tx, eta_ms, user_id, segment_ids).await?;
        tx.commit().await?;

        let count = planned.len();
        self.arm_all(planned);
        Ok(count)
    }

    /// Run one removal right now, bypassing the queue
    pub async fn execute(&self, user_id: i64, segment_id: i64) -> Result<bool> {
        execute_removal(&self.pool, self.clock.as_ref(), user_id, segment_id).await
    }

    /// Number of removals still waiting in the store
    pub async fn pending_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&removals::count())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Start a timer for each task; only call with rows already committed
    pub(crate) fn arm_all(&self, tasks: Vec<RemovalTask>) {
        let now_ms = self.clock.now().timestamp_millis();
        for task in tasks {
            let delay = Duration::from_millis(task.eta_ms.saturating_sub(now_ms).max(0) as u64);
            let queue = self.queue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if queue.send(task).is_err() {
                    warn!(
                        "Removal queue closed; user {} / segment {} left for recovery",
                        task.user_id, task.segment_id
                    );
                }
            });
        }
    }
}

/// Insert schedule rows inside the caller's transaction
///
/// Returns the tasks whose rows were actually inserted; those need timers
/// once the transaction commits.
pub(crate) async fn persist_removals(
    conn: &mut SqliteConnection,
    eta_ms: i64,
    user_id: i64,
    segment_ids: &[i64],
) -> Result<Vec<RemovalTask>> {
    let mut planned = Vec::with_capacity(segment_ids.len());
    for &segment_id in segment_ids {
        let inserted = sqlx::query(&removals::insert_or_ignore(eta_ms, user_id, segment_id))
            .execute(&mut *conn)
            .await?
            .rows_affected();
        if inserted > 0 {
            planned.push(RemovalTask {
                user_id,
                segment_id,
                eta_ms,
            });
        }
    }
    Ok(planned)
}

/// Remove the membership, log it and clear the schedule row, all or nothing
///
/// Returns false when no schedule row exists for the pair, meaning the
/// removal already completed and nothing was written.
pub async fn execute_removal(
    pool: &SqlitePool,
    clock: &dyn Clock,
    user_id: i64,
    segment_id: i64,
) -> Result<bool> {
    let mut tx = begin_write(pool).await?;

    let planned = sqlx::query(&removals::delete(user_id, segment_id))
        .execute(&mut *tx)
        .await?
        .rows_affected();
    if planned == 0 {
        debug!(
            "No pending removal for user {} / segment {}, skipping",
            user_id, segment_id
        );
        return Ok(false);
    }

    sqlx::query(&memberships::delete(user_id, segment_id))
        .execute(&mut *tx)
        .await?;
    let stamp_ms = clock.now().timestamp_millis();
    append_record(&mut tx, stamp_ms, user_id, segment_id, Operation::Remove).await?;

    tx.commit().await?;

    info!("Removed user {} from segment {} as planned", user_id, segment_id);
    Ok(true)
}

async fn run_worker(
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
    mut receiver: mpsc::UnboundedReceiver<RemovalTask>,
) {
    while let Some(task) = receiver.recv().await {
        if let Err(e) = execute_removal(&pool, clock.as_ref(), task.user_id, task.segment_id).await {
            error!(
                "Failed removal of user {} from segment {}: {}",
                task.user_id,
                task.segment_id,
                e.detail()
            );
        }
    }
    debug!("Removal queue closed, worker exiting");
}
