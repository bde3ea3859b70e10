//! Tests for query-history retrieval against a scripted session

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::json;
use snowlens_core::history::{self, HistoryFilter, TimeWindow};
use snowlens_core::{Bind, QueryResult, Session, Table};

/// Session that returns a canned table and records what it was asked
struct ScriptedSession {
    table: Table,
    calls: Mutex<Vec<(String, Vec<Bind>)>>,
}

impl ScriptedSession {
    fn new(table: Table) -> Self {
        Self {
            table,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Session for ScriptedSession {
    async fn execute(&self, sql: &str, binds: &[Bind]) -> QueryResult<Table> {
        self.calls
            .lock()
            .unwrap()
            .push((sql.to_string(), binds.to_vec()));
        Ok(self.table.clone())
    }
}

fn filter() -> HistoryFilter {
    HistoryFilter {
        warehouse: "FIN_VIZ".to_string(),
        user: "ALICE@EXAMPLE.COM".to_string(),
        window: TimeWindow::new(
            Utc.with_ymd_and_hms(2022, 8, 1, 15, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2022, 8, 1, 16, 0, 0).unwrap(),
        )
        .unwrap(),
    }
}

#[tokio::test]
async fn list_tags_parses_summaries_and_binds_the_filter() {
    let table = Table {
        columns: vec![
            "TAG".to_string(),
            "FIRST_START".to_string(),
            "LAST_START".to_string(),
            "QUERY_COUNT".to_string(),
        ],
        rows: vec![
            vec![
                json!("nightly-batch-01"),
                json!("2022-08-01 15:05:00.000"),
                json!("2022-08-01 15:40:00.000"),
                json!(12),
            ],
            // Untagged queries group under a null tag.
            vec![
                json!(null),
                json!("1659366300.0"),
                json!("1659366300.0"),
                json!("3"),
            ],
        ],
    };
    let session = ScriptedSession::new(table);

    let summaries = history::list_tags(&session, &filter()).await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].tag, "nightly-batch-01");
    assert_eq!(summaries[0].query_count, 12);
    assert_eq!(summaries[1].tag, "");
    assert_eq!(summaries[1].query_count, 3);
    assert_eq!(summaries[1].first_start.timestamp(), 1_659_366_300);

    let calls = session.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let (sql, binds) = &calls[0];
    assert_eq!(sql, history::TAG_SUMMARY_SQL);
    assert_eq!(
        binds,
        &vec![
            Bind::text("2022-08-01 15:00:00"),
            Bind::text("2022-08-01 16:00:00"),
            Bind::text("FIN_VIZ"),
            Bind::text("ALICE@EXAMPLE.COM"),
        ]
    );
}

#[tokio::test]
async fn list_queries_appends_the_tag_bind() {
    let table = Table {
        columns: vec![
            "SESSION_ID".to_string(),
            "QUERY_ID".to_string(),
            "START_TIME".to_string(),
            "END_TIME".to_string(),
            "QUERY_TAG".to_string(),
            "ROWS_PRODUCED".to_string(),
            "QUERY_TEXT".to_string(),
        ],
        rows: vec![vec![
            json!(20041),
            json!("01a2-0404"),
            json!("2022-08-01 15:05:00.000"),
            json!("2022-08-01 15:06:30.000"),
            json!("nightly-batch-01-part-7"),
            json!(4521),
            json!("SELECT * FROM sales"),
        ]],
    };
    let session = ScriptedSession::new(table);

    let records = history::list_queries(&session, &filter(), "nightly-batch-01")
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].session_id, "20041");
    assert_eq!(records[0].rows_produced, 4521);
    assert_eq!(
        (records[0].end_time - records[0].start_time).num_seconds(),
        90
    );

    let calls = session.calls.lock().unwrap();
    let (sql, binds) = &calls[0];
    assert_eq!(sql, history::TAG_QUERIES_SQL);
    assert_eq!(binds.len(), 5);
    assert_eq!(binds[4], Bind::text("nightly-batch-01"));
}

#[tokio::test]
async fn missing_column_is_a_malformed_row() {
    let table = Table {
        columns: vec!["TAG".to_string()],
        rows: vec![],
    };
    let session = ScriptedSession::new(table);
    let err = history::list_tags(&session, &filter()).await.unwrap_err();
    assert!(matches!(
        err,
        snowlens_core::QueryError::MalformedRow(_)
    ));
}
