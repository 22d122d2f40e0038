/// Expected database schema version
/// All databases must use this version for compatibility
pub const EXPECTED_DB_VERSION: &str = "1";

/// Default HTTP port when neither config nor CLI sets one
pub const DEFAULT_PORT: u16 = 8080;

/// History is not kept for months before the service went live
pub const MIN_HISTORY_YEAR: i32 = 2023;

/// Field separator of the history CSV export
pub const CSV_SEPARATOR: char = ';';
