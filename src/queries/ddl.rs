use sea_query::{ColumnDef, ForeignKey, ForeignKeyAction, Index, SqliteQueryBuilder, Table};

use crate::schema::{Memberships, Metadata, OperationHistory, ScheduledRemovals, Segments};

/// CREATE TABLE IF NOT EXISTS metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)
pub fn create_metadata_table() -> String {
    Table::create()
        .table(Metadata::Table)
        .if_not_exists()
        .col(ColumnDef::new(Metadata::Key).string().primary_key())
        .col(ColumnDef::new(Metadata::Value).string().not_null())
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS segments (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     name TEXT NOT NULL UNIQUE,
///     automatic_percent INTEGER NOT NULL DEFAULT 0,
///     deleted INTEGER NOT NULL DEFAULT 0
/// )
///
/// AUTOINCREMENT keeps ids from ever being handed out twice, and the unique
/// name covers soft-deleted rows as well.
pub fn create_segments_table() -> String {
    Table::create()
        .table(Segments::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(Segments::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(ColumnDef::new(Segments::Name).string().not_null().unique_key())
        .col(
            ColumnDef::new(Segments::AutomaticPercent)
                .integer()
                .not_null()
                .default(0),
        )
        .col(
            ColumnDef::new(Segments::Deleted)
                .integer()
                .not_null()
                .default(0),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS memberships (
///     user_id INTEGER NOT NULL,
///     segment_id INTEGER NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, segment_id)
/// )
pub fn create_memberships_table() -> String {
    Table::create()
        .table(Memberships::Table)
        .if_not_exists()
        .col(ColumnDef::new(Memberships::UserId).big_integer().not_null())
        .col(
            ColumnDef::new(Memberships::SegmentId)
                .big_integer()
                .not_null(),
        )
        .primary_key(
            Index::create()
                .col(Memberships::UserId)
                .col(Memberships::SegmentId),
        )
        .foreign_key(
            ForeignKey::create()
                .from(Memberships::Table, Memberships::SegmentId)
                .to(Segments::Table, Segments::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS operation_history (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     stamp_ms INTEGER NOT NULL,
///     user_id INTEGER NOT NULL,
///     segment_id INTEGER NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
///     operation TEXT NOT NULL
/// )
pub fn create_operation_history_table() -> String {
    Table::create()
        .table(OperationHistory::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(OperationHistory::Id)
                .integer()
                .primary_key()
                .auto_increment(),
        )
        .col(
            ColumnDef::new(OperationHistory::StampMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(OperationHistory::UserId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(OperationHistory::SegmentId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(OperationHistory::Operation)
                .string()
                .not_null(),
        )
        .foreign_key(
            ForeignKey::create()
                .from(OperationHistory::Table, OperationHistory::SegmentId)
                .to(Segments::Table, Segments::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE TABLE IF NOT EXISTS scheduled_removals (
///     eta_ms INTEGER NOT NULL,
///     user_id INTEGER NOT NULL,
///     segment_id INTEGER NOT NULL REFERENCES segments(id) ON DELETE CASCADE,
///     PRIMARY KEY (user_id, segment_id)
/// )
pub fn create_scheduled_removals_table() -> String {
    Table::create()
        .table(ScheduledRemovals::Table)
        .if_not_exists()
        .col(
            ColumnDef::new(ScheduledRemovals::EtaMs)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ScheduledRemovals::UserId)
                .big_integer()
                .not_null(),
        )
        .col(
            ColumnDef::new(ScheduledRemovals::SegmentId)
                .big_integer()
                .not_null(),
        )
        .primary_key(
            Index::create()
                .col(ScheduledRemovals::UserId)
                .col(ScheduledRemovals::SegmentId),
        )
        .foreign_key(
            ForeignKey::create()
                .from(ScheduledRemovals::Table, ScheduledRemovals::SegmentId)
                .to(Segments::Table, Segments::Id)
                .on_delete(ForeignKeyAction::Cascade),
        )
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_memberships_segment_id ON memberships(segment_id)
pub fn create_memberships_segment_id_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_memberships_segment_id")
        .table(Memberships::Table)
        .col(Memberships::SegmentId)
        .to_string(SqliteQueryBuilder)
}

/// CREATE INDEX IF NOT EXISTS idx_operation_history_stamp ON operation_history(stamp_ms)
pub fn create_operation_history_stamp_index() -> String {
    Index::create()
        .if_not_exists()
        .name("idx_operation_history_stamp")
        .table(OperationHistory::Table)
        .col(OperationHistory::StampMs)
        .to_string(SqliteQueryBuilder)
}
