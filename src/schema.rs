use sea_query::Iden;

/// Metadata table - key-value store for database configuration
#[derive(Iden)]
pub enum Metadata {
    Table,
    Key,
    Value,
}

/// Segments table - segment definitions, never physically deleted
#[derive(Iden)]
pub enum Segments {
    Table,
    Id,
    Name,
    AutomaticPercent,
    Deleted,
}

/// Memberships table - one row per (user, segment) pair
#[derive(Iden)]
pub enum Memberships {
    Table,
    UserId,
    SegmentId,
}

/// Operation history table - append-only audit trail
#[derive(Iden)]
pub enum OperationHistory {
    Table,
    Id,
    StampMs,
    UserId,
    SegmentId,
    Operation,
}

/// Scheduled removals table - durable record of pending TTL removals
#[derive(Iden)]
pub enum ScheduledRemovals {
    Table,
    EtaMs,
    UserId,
    SegmentId,
}
