//! Operation history: appending audit records and exporting a month of them.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use std::fmt;
use std::str::FromStr;

use crate::constants::{CSV_SEPARATOR, MIN_HISTORY_YEAR};
use crate::error::{Result, SegmentError};
use crate::queries::history;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add" => Ok(Operation::Add),
            "remove" => Ok(Operation::Remove),
            other => Err(format!("Unknown operation '{}'", other)),
        }
    }
}

/// One exported audit record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub user_id: i64,
    pub segment_name: String,
    pub operation: Operation,
    pub stamp: DateTime<Utc>,
}

/// Append one record to the audit trail
pub(crate) async fn append_record(
    conn: &mut SqliteConnection,
    stamp_ms: i64,
    user_id: i64,
    segment_id: i64,
    operation: Operation,
) -> Result<()> {
    let sql = history::insert(stamp_ms, user_id, segment_id, operation.as_str());
    sqlx::query(&sql).execute(&mut *conn).await?;
    Ok(())
}

/// First moment of the month and first moment of the next one, in UTC
pub fn month_bounds(year: i32, month: u32) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    if year < MIN_HISTORY_YEAR || !(1..=12).contains(&month) {
        return Err(SegmentError::BadTime);
    }

    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or(SegmentError::BadTime)?;
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .ok_or(SegmentError::BadTime)?;

    Ok((start, end))
}

/// All records stamped within the given month, oldest first
pub async fn get_history(pool: &SqlitePool, year: i32, month: u32) -> Result<Vec<HistoryRecord>> {
    let (start, end) = month_bounds(year, month)?;
    let sql = history::select_between(start.timestamp_millis(), end.timestamp_millis());

    let rows: Vec<(i64, i64, String, String)> = sqlx::query_as(&sql).fetch_all(pool).await?;

    rows.into_iter()
        .map(|(stamp_ms, user_id, segment_name, operation)| -> Result<HistoryRecord> {
            let operation = operation
                .parse()
                .map_err(|e: String| sqlx::Error::Decode(e.into()))?;
            let stamp = Utc
                .timestamp_millis_opt(stamp_ms)
                .single()
                .ok_or_else(|| sqlx::Error::Decode(format!("Invalid stamp {}", stamp_ms).into()))?;
            Ok(HistoryRecord {
                user_id,
                segment_name,
                operation,
                stamp,
            })
        })
        .collect()
}

/// Render records as `user_id;segment_name;operation;stamp` lines
pub fn render_csv(records: &[HistoryRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let fields = [
            record.user_id.to_string(),
            record.segment_name.clone(),
            record.operation.to_string(),
            record.stamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        ];
        let line: Vec<String> = fields.iter().map(|f| quote_field(f)).collect();
        out.push_str(&line.join(&CSV_SEPARATOR.to_string()));
        out.push('\n');
    }
    out
}

fn quote_field(field: &str) -> String {
    if field.contains(CSV_SEPARATOR) || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
