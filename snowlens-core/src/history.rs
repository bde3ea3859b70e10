//! Query-history retrieval over the account usage views.
//!
//! Two fixed templates drive the whole feature: a tag summary grouping
//! executions by the first 16 characters of their query tag, and the
//! per-tag listing that feeds the timeline. Both exclude connection
//! probes (`select 1`) and non-SELECT statements.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;

use crate::client::{Bind, Session, Table};
use crate::error::{QueryError, QueryResult, ValidationError, ValidationResult};

/// Tag summary template; binds: window start, window end, warehouse, user
pub const TAG_SUMMARY_SQL: &str = "\
SELECT SUBSTR(query_tag, 1, 16) AS tag, \
MIN(start_time) AS first_start, MAX(start_time) AS last_start, COUNT(*) AS query_count \
FROM snowflake.account_usage.query_history \
WHERE start_time BETWEEN ? AND ? \
AND warehouse_name = ? \
AND user_name = ? \
AND query_type = 'SELECT' AND query_text <> 'select 1' \
GROUP BY tag \
ORDER BY first_start";

/// Per-tag listing template; binds: window start, window end, warehouse, user, tag
pub const TAG_QUERIES_SQL: &str = "\
SELECT session_id, query_id, start_time, end_time, query_tag, rows_produced, query_text \
FROM snowflake.account_usage.query_history \
WHERE start_time BETWEEN ? AND ? \
AND warehouse_name = ? \
AND user_name = ? \
AND SUBSTR(query_tag, 1, 16) = ? \
AND query_type = 'SELECT' AND query_text <> 'select 1' \
ORDER BY session_id, start_time";

/// Bind format for timestamp window bounds
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A half-open observation window over query start times
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a window from explicit bounds
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidWindow` if the end is not after
    /// the start.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ValidationResult<Self> {
        if end <= start {
            return Err(ValidationError::InvalidWindow {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(Self { start, end })
    }

    /// Creates a window from a date and two times of day
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidWindow` if `to` is not after
    /// `from`.
    pub fn on_date(date: NaiveDate, from: NaiveTime, to: NaiveTime) -> ValidationResult<Self> {
        Self::new(date.and_time(from).and_utc(), date.and_time(to).and_utc())
    }

    /// Returns the window start
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Returns the window end
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Returns the window length in whole seconds (always positive)
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Formats a bound the way the templates bind timestamps
    fn bind(at: DateTime<Utc>) -> Bind {
        Bind::text(at.format(TIMESTAMP_FORMAT).to_string())
    }
}

/// Filter criteria shared by both history queries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryFilter {
    /// Warehouse name to match
    pub warehouse: String,
    /// User name to match
    pub user: String,
    /// Observation window over query start times
    pub window: TimeWindow,
}

impl HistoryFilter {
    /// Checks that the filter names a warehouse and a user
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyField` naming the missing field.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.warehouse.trim().is_empty() {
            return Err(ValidationError::EmptyField("warehouse"));
        }
        if self.user.trim().is_empty() {
            return Err(ValidationError::EmptyField("user"));
        }
        Ok(())
    }

    /// Returns the shared bind prefix: window bounds, warehouse, user
    fn binds(&self) -> Vec<Bind> {
        vec![
            TimeWindow::bind(self.window.start),
            TimeWindow::bind(self.window.end),
            Bind::text(self.warehouse.clone()),
            Bind::text(self.user.clone()),
        ]
    }
}

/// One batch of queries sharing a tag prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSummary {
    /// First 16 characters of the query tag; empty for untagged queries
    pub tag: String,
    /// Earliest start time in the window
    pub first_start: DateTime<Utc>,
    /// Latest start time in the window
    pub last_start: DateTime<Utc>,
    /// Number of matching queries
    pub query_count: u64,
}

/// One executed query within a tagged batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    /// Warehouse session the query ran in
    pub session_id: String,
    /// Query identifier
    pub query_id: String,
    /// Execution start
    pub start_time: DateTime<Utc>,
    /// Execution end
    pub end_time: DateTime<Utc>,
    /// Full query tag
    pub tag: String,
    /// Rows produced by the query
    pub rows_produced: u64,
    /// Statement text
    pub query_text: String,
}

/// Lists the tagged batches seen in the window
///
/// # Errors
///
/// Returns `QueryError` if execution fails or a row cannot be parsed.
pub async fn list_tags(
    session: &dyn Session,
    filter: &HistoryFilter,
) -> QueryResult<Vec<TagSummary>> {
    let table = session.execute(TAG_SUMMARY_SQL, &filter.binds()).await?;
    let tag = require_column(&table, "tag")?;
    let first_start = require_column(&table, "first_start")?;
    let last_start = require_column(&table, "last_start")?;
    let query_count = require_column(&table, "query_count")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(TagSummary {
                tag: string_cell(row, tag),
                first_start: timestamp_cell(row, first_start)?,
                last_start: timestamp_cell(row, last_start)?,
                query_count: count_cell(row, query_count),
            })
        })
        .collect()
}

/// Lists the individual queries of one tagged batch
///
/// # Errors
///
/// Returns `QueryError` if execution fails or a row cannot be parsed.
pub async fn list_queries(
    session: &dyn Session,
    filter: &HistoryFilter,
    tag: &str,
) -> QueryResult<Vec<QueryRecord>> {
    let mut binds = filter.binds();
    binds.push(Bind::text(tag));
    let table = session.execute(TAG_QUERIES_SQL, &binds).await?;

    let session_id = require_column(&table, "session_id")?;
    let query_id = require_column(&table, "query_id")?;
    let start_time = require_column(&table, "start_time")?;
    let end_time = require_column(&table, "end_time")?;
    let query_tag = require_column(&table, "query_tag")?;
    let rows_produced = require_column(&table, "rows_produced")?;
    let query_text = require_column(&table, "query_text")?;

    table
        .rows
        .iter()
        .map(|row| {
            Ok(QueryRecord {
                session_id: string_cell(row, session_id),
                query_id: string_cell(row, query_id),
                start_time: timestamp_cell(row, start_time)?,
                end_time: timestamp_cell(row, end_time)?,
                tag: string_cell(row, query_tag),
                rows_produced: count_cell(row, rows_produced),
                query_text: string_cell(row, query_text),
            })
        })
        .collect()
}

/// Resolves a column index, failing loudly when the shape is wrong
fn require_column(table: &Table, name: &str) -> QueryResult<usize> {
    table
        .column_index(name)
        .ok_or_else(|| QueryError::MalformedRow(format!("result has no column '{name}'")))
}

/// Reads a cell as a string; nulls and missing cells become empty
fn string_cell(row: &[Value], index: usize) -> String {
    match row.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Reads a cell as a non-negative count; nulls become zero
fn count_cell(row: &[Value], index: usize) -> u64 {
    match row.get(index) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
        Some(Value::String(s)) => s.parse().unwrap_or(0),
        _ => 0,
    }
}

/// Reads a cell as a UTC timestamp
///
/// The gateway returns timestamps either as fractional epoch seconds or
/// as formatted text, depending on the column type, so both are
/// accepted.
fn timestamp_cell(row: &[Value], index: usize) -> QueryResult<DateTime<Utc>> {
    let raw = match row.get(index) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        other => {
            return Err(QueryError::MalformedRow(format!(
                "expected timestamp, got {other:?}"
            )))
        }
    };
    parse_timestamp(&raw)
        .ok_or_else(|| QueryError::MalformedRow(format!("unparseable timestamp '{raw}'")))
}

/// Parses epoch seconds, `YYYY-MM-DD HH:MM:SS[.f]`, or RFC 3339
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(epoch) = raw.parse::<f64>() {
        let secs = epoch.trunc() as i64;
        let nanos = (epoch.fract() * 1_000_000_000.0).round() as u32;
        return DateTime::from_timestamp(secs, nanos);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
