use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};

use crate::schema::{Memberships, Segments};

/// INSERT INTO memberships (user_id, segment_id) VALUES (?, ?)
/// ON CONFLICT (user_id, segment_id) DO NOTHING
pub fn insert_or_ignore(user_id: i64, segment_id: i64) -> String {
    Query::insert()
        .into_table(Memberships::Table)
        .columns([Memberships::UserId, Memberships::SegmentId])
        .values_panic([user_id.into(), segment_id.into()])
        .on_conflict(
            OnConflict::columns([Memberships::UserId, Memberships::SegmentId])
                .do_nothing()
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM memberships WHERE user_id = ? AND segment_id = ?
pub fn delete(user_id: i64, segment_id: i64) -> String {
    Query::delete()
        .from_table(Memberships::Table)
        .and_where(Expr::col(Memberships::UserId).eq(user_id))
        .and_where(Expr::col(Memberships::SegmentId).eq(segment_id))
        .to_string(SqliteQueryBuilder)
}

/// DELETE FROM memberships WHERE segment_id = ?
pub fn delete_by_segment(segment_id: i64) -> String {
    Query::delete()
        .from_table(Memberships::Table)
        .and_where(Expr::col(Memberships::SegmentId).eq(segment_id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT DISTINCT user_id FROM memberships ORDER BY user_id
pub fn select_known_user_ids() -> String {
    Query::select()
        .distinct()
        .column(Memberships::UserId)
        .from(Memberships::Table)
        .order_by(Memberships::UserId, Order::Asc)
        .to_string(SqliteQueryBuilder)
}

/// SELECT segments.name FROM memberships
/// INNER JOIN segments ON segments.id = memberships.segment_id
/// WHERE memberships.user_id = ? AND segments.deleted = 0
/// ORDER BY segments.name
pub fn select_segment_names_for_user(user_id: i64) -> String {
    Query::select()
        .column((Segments::Table, Segments::Name))
        .from(Memberships::Table)
        .inner_join(
            Segments::Table,
            Expr::col((Segments::Table, Segments::Id))
                .equals((Memberships::Table, Memberships::SegmentId)),
        )
        .and_where(Expr::col((Memberships::Table, Memberships::UserId)).eq(user_id))
        .and_where(Expr::col((Segments::Table, Segments::Deleted)).eq(0))
        .order_by((Segments::Table, Segments::Name), Order::Asc)
        .to_string(SqliteQueryBuilder)
}
