use sea_query::{Expr, Query, SqliteQueryBuilder};

use crate::schema::Segments;

/// INSERT INTO segments (name, automatic_percent) VALUES (?, ?)
pub fn insert(name: &str, automatic_percent: i32) -> String {
    Query::insert()
        .into_table(Segments::Table)
        .columns([Segments::Name, Segments::AutomaticPercent])
        .values_panic([name.into(), automatic_percent.into()])
        .to_string(SqliteQueryBuilder)
}

/// SELECT id, deleted FROM segments WHERE name = ?
pub fn select_by_name(name: &str) -> String {
    Query::select()
        .columns([Segments::Id, Segments::Deleted])
        .from(Segments::Table)
        .and_where(Expr::col(Segments::Name).eq(name))
        .to_string(SqliteQueryBuilder)
}

/// UPDATE segments SET deleted = 1 WHERE id = ?
pub fn mark_deleted(id: i64) -> String {
    Query::update()
        .table(Segments::Table)
        .value(Segments::Deleted, 1)
        .and_where(Expr::col(Segments::Id).eq(id))
        .to_string(SqliteQueryBuilder)
}

/// SELECT id FROM segments
/// WHERE deleted = 0 AND automatic_percent > 0 AND automatic_percent >= ?
///
/// The `> 0` guard keeps 0% segments out even when the draw lands on exactly 0.
pub fn select_auto_enroll_ids(xi: f64) -> String {
    Query::select()
        .column(Segments::Id)
        .from(Segments::Table)
        .and_where(Expr::col(Segments::Deleted).eq(0))
        .and_where(Expr::col(Segments::AutomaticPercent).gt(0))
        .and_where(Expr::col(Segments::AutomaticPercent).gte(xi))
        .to_string(SqliteQueryBuilder)
}
