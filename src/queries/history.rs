use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use crate::schema::{OperationHistory, Segments};

/// INSERT INTO operation_history (stamp_ms, user_id, segment_id, operation) VALUES (?, ?, ?, ?)
pub fn insert(stamp_ms: i64, user_id: i64, segment_id: i64, operation: &str) -> String {
    Query::insert()
        .into_table(OperationHistory::Table)
        .columns([
            OperationHistory::StampMs,
            OperationHistory::UserId,
            OperationHistory::SegmentId,
            OperationHistory::Operation,
        ])
        .values_panic([
            stamp_ms.into(),
            user_id.into(),
            segment_id.into(),
            operation.into(),
        ])
        .to_string(SqliteQueryBuilder)
}

/// SELECT operation_history.stamp_ms, operation_history.user_id, segments.name, operation_history.operation
/// FROM operation_history
/// INNER JOIN segments ON segments.id = operation_history.segment_id
/// WHERE stamp_ms >= ? AND stamp_ms < ?
/// ORDER BY stamp_ms, operation_history.id
pub fn select_between(start_ms: i64, end_ms: i64) -> String {
    Query::select()
        .column((OperationHistory::Table, OperationHistory::StampMs))
        .column((OperationHistory::Table, OperationHistory::UserId))
        .column((Segments::Table, Segments::Name))
        .column((OperationHistory::Table, OperationHistory::Operation))
        .from(OperationHistory::Table)
        .inner_join(
            Segments::Table,
            Expr::col((Segments::Table, Segments::Id))
                .equals((OperationHistory::Table, OperationHistory::SegmentId)),
        )
        .and_where(Expr::col((OperationHistory::Table, OperationHistory::StampMs)).gte(start_ms))
        .and_where(Expr::col((OperationHistory::Table, OperationHistory::StampMs)).lt(end_ms))
        .order_by((OperationHistory::Table, OperationHistory::StampMs), Order::Asc)
        .order_by((OperationHistory::Table, OperationHistory::Id), Order::Asc)
        .to_string(SqliteQueryBuilder)
}
