use sea_query::{Expr, Func, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::ScheduledRemovals;

/// INSERT INTO scheduled_removals (eta_ms, user_id, segment_id) VALUES (?, ?, ?)
/// ON CONFLICT (user_id, segment_id) DO NOTHING
pub fn insert_or_ignore(eta_ms: i64, user_id: i64, segment_id: i64) -> String {
    Query::insert()
        .into_table(ScheduledRemovals::Table)
        .columns([
            ScheduledRemovals::EtaMs,
            ScheduledRemovals::UserId,
            ScheduledRemovals::SegmentId,
        ])
        .values_panic([eta_ms.into(), user_id.into(), segment_id.into()])
        .on_conflict(
            OnConflict::columns([ScheduledRemovals::UserId, ScheduledRemovals::SegmentId])
                .do_nothing()
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

/// SELECT eta_ms, user_id, segment_id FROM scheduled_removals ORDER BY eta_ms
pub fn select_all() -> String {
    Query::select()
        .columns([
            ScheduledRemovals::EtaMs,
            ScheduledRemovals::UserId,
            ScheduledRemovals::SegmentId,
        ])
        .from(ScheduledRemovals::Table)
        .order_by(ScheduledRemovals::EtaMs, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM scheduled_removals WHERE user_id = ? AND segment_id = ?
pub fn delete(user_id: i64, segment_id: i64) -> String {
    Query::delete()
        .from_table(ScheduledRemovals::Table)
        .and_where(Expr::col(ScheduledRemovals::UserId).eq(user_id))
        .and_where(Expr::col(ScheduledRemovals::SegmentId).eq(segment_id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT COUNT(*) FROM scheduled_removals
pub fn count() -> String {
    Query::select()
        .expr(Func::count(Expr::col(ScheduledRemovals::UserId)))
        .from(ScheduledRemovals::Table)
        .to_string(SqliteQueryBuilder)
}
