//! Segment definitions: creation with retroactive enrollment and soft deletion.

use log::{info, warn};
use sqlx::sqlite::{SqliteConnection, SqlitePool};

use crate::clock::Clock;
use crate::db::begin_write;
use crate::error::{Result, SegmentError};
use crate::membership::enroll_retroactively;
use crate::queries::{memberships, segments};

/// Create a segment, enrolling `percent`% of already known users into it
pub async fn create_segment(
    pool: &SqlitePool,
    clock: &dyn Clock,
    name: &str,
    percent: i64,
) -> Result<()> {
    if !(0..=100).contains(&percent) {
        return Err(SegmentError::BadPercent);
    }
    if name.is_empty() {
        return Err(SegmentError::NameEmpty);
    }

    let mut tx = begin_write(pool).await?;

    // The unique index on name covers soft-deleted rows too, so a violation
    // here is the whole "name ever used" check.
    let sql = segments::insert(name, percent as i32);
    let segment_id = match sqlx::query(&sql).execute(&mut *tx).await {
        Ok(done) => done.last_insert_rowid(),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            return Err(SegmentError::NameTaken);
        }
        Err(e) => return Err(e.into()),
    };

    let enrolled = if percent > 0 {
        let stamp_ms = clock.now().timestamp_millis();
        enroll_retroactively(&mut tx, stamp_ms, segment_id, percent).await?
    } else {
        0
    };

    tx.commit().await?;

    info!(
        "Created segment '{}' (id {}, {}% automatic, {} users enrolled)",
        name, segment_id, percent, enrolled
    );
    Ok(())
}

/// Mark a segment deleted and drop every membership it had
pub async fn delete_segment(pool: &SqlitePool, name: &str) -> Result<()> {
    let mut tx = begin_write(pool).await?;

    let row: Option<(i64, i64)> = sqlx::query_as(&segments::select_by_name(name))
        .fetch_optional(&mut *tx)
        .await?;

    let segment_id = match row {
        None => return Err(SegmentError::NameFree),
        Some((_, deleted)) if deleted != 0 => return Err(SegmentError::AlreadyDeleted),
        Some((id, _)) => id,
    };

    sqlx::query(&segments::mark_deleted(segment_id))
        .execute(&mut *tx)
        .await?;
    let dropped = sqlx::query(&memberships::delete_by_segment(segment_id))
        .execute(&mut *tx)
        .await?
        .rows_affected();

    tx.commit().await?;

    info!("Deleted segment '{}' ({} memberships dropped)", name, dropped);
    Ok(())
}

/// Resolve a segment name to the id of a live segment
pub(crate) async fn resolve_live_segment(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    let row: Option<(i64, i64)> = sqlx::query_as(&segments::select_by_name(name))
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        None => {
            warn!("Didn't find id for segment '{}'", name);
            Err(SegmentError::NameFree)
        }
        Some((_, deleted)) if deleted != 0 => {
            warn!("Segment '{}' is deleted", name);
            Err(SegmentError::AlreadyDeleted)
        }
        Some((id, _)) => Ok(id),
    }
}
