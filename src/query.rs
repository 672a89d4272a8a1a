// Query Gateway - the only component that accepts unstructured input.
// A statement is token-scanned against an allow-listed read-only subset
// before it ever reaches the execution engine.

use std::time::Instant;

use rusqlite::types::ValueRef;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AnalyticsError, Result};
use crate::store::TabularStore;

/// Keywords that can modify data or schema, or escape the read-only subset.
/// Matched as whole word tokens, case-insensitive, anywhere in the statement.
/// Deliberately conservative: a forbidden word inside a string literal is
/// still rejected.
const FORBIDDEN_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "replace", "attach", "detach",
    "pragma", "vacuum", "reindex",
];

#[derive(Debug, Clone, Serialize)]
pub struct ColumnMeta {
    pub name: String,
    /// Value type observed in the first row: integer, real, text, blob or null.
    pub data_type: String,
}

/// Result of one gateway invocation. Owned by the caller, discarded after
/// the response is returned.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Reject anything that is not a single read-only SELECT statement.
/// Returns the trimmed statement on acceptance.
fn validate_read_only(query: &str) -> Result<&str> {
    let trimmed = query.trim().trim_end_matches(';').trim_end();
    if trimmed.is_empty() {
        return Err(AnalyticsError::UnsafeQuery("empty statement".into()));
    }

    // A second statement after the terminator is an injection attempt.
    if trimmed.contains(';') {
        return Err(AnalyticsError::UnsafeQuery(
            "multiple statements are not allowed".into(),
        ));
    }

    let first_word = trimmed
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .find(|w| !w.is_empty())
        .unwrap_or("");
    if !first_word.eq_ignore_ascii_case("select") {
        return Err(AnalyticsError::UnsafeQuery(format!(
            "statement must begin with SELECT, found '{}'",
            first_word
        )));
    }

    for word in trimmed.split(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
        if word.is_empty() {
            continue;
        }
        let lowered = word.to_ascii_lowercase();
        if FORBIDDEN_KEYWORDS.contains(&lowered.as_str()) {
            return Err(AnalyticsError::UnsafeQuery(format!(
                "forbidden keyword '{}'",
                lowered
            )));
        }
    }

    Ok(trimmed)
}

fn value_ref_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(r) => serde_json::Number::from_f64(r)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::from(format!("<blob {} bytes>", b.len())),
    }
}

fn value_ref_type(value: ValueRef<'_>) -> &'static str {
    match value {
        ValueRef::Null => "null",
        ValueRef::Integer(_) => "integer",
        ValueRef::Real(_) => "real",
        ValueRef::Text(_) => "text",
        ValueRef::Blob(_) => "blob",
    }
}

/// Execute a caller-supplied read-only query against the store.
pub fn execute(store: &TabularStore, config: &Config, query: &str) -> Result<QueryResult> {
    let statement = match validate_read_only(query) {
        Ok(s) => s,
        Err(e) => {
            warn!(%query, error = %e, "query rejected");
            return Err(e);
        }
    };

    let conn = store.connection();

    // Abort pathological queries once the deadline passes. The store is
    // read-only, so interrupting execution is always safe.
    let timeout = config.query_timeout();
    let deadline = Instant::now() + timeout;
    conn.progress_handler(100, Some(move || Instant::now() >= deadline));

    let result = run_statement(store, config, statement);

    conn.progress_handler(0, None::<fn() -> bool>);

    match result {
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == rusqlite::ErrorCode::OperationInterrupted =>
        {
            warn!(%query, ?timeout, "query timed out");
            Err(AnalyticsError::QueryTimeout(timeout))
        }
        Err(e) => Err(AnalyticsError::QuerySyntax(e.to_string())),
        Ok(Ok(result)) => {
            debug!(rows = result.row_count(), "query executed");
            Ok(result)
        }
        Ok(Err(e)) => Err(e),
    }
}

fn run_statement(
    store: &TabularStore,
    config: &Config,
    statement: &str,
) -> rusqlite::Result<Result<QueryResult>> {
    let conn = store.connection();
    let mut stmt = conn.prepare(statement)?;

    // Defense in depth behind the keyword scan: SQLite itself must agree the
    // prepared statement cannot write.
    if !stmt.readonly() {
        return Ok(Err(AnalyticsError::UnsafeQuery(
            "statement is not read-only".into(),
        )));
    }

    let column_names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    let column_count = column_names.len();

    let mut rows = stmt.query([])?;
    let mut out_rows: Vec<Map<String, Value>> = Vec::new();
    let mut column_types: Vec<&'static str> = vec!["null"; column_count];

    while let Some(row) = rows.next()? {
        if out_rows.len() >= config.max_result_rows {
            return Ok(Err(AnalyticsError::ResultTooLarge {
                rows: out_rows.len() + 1,
                cap: config.max_result_rows,
            }));
        }

        let mut mapped = Map::with_capacity(column_count);
        for (idx, name) in column_names.iter().enumerate() {
            let value = row.get_ref(idx)?;
            if out_rows.is_empty() {
                column_types[idx] = value_ref_type(value);
            }
            mapped.insert(name.clone(), value_ref_to_json(value));
        }
        out_rows.push(mapped);
    }

    let columns = column_names
        .into_iter()
        .zip(column_types)
        .map(|(name, data_type)| ColumnMeta {
            name,
            data_type: data_type.to_string(),
        })
        .collect();

    Ok(Ok(QueryResult {
        columns,
        rows: out_rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_fixtures::{guest_csv, small_store, unit_csv};

    fn config() -> Config {
        Config::default()
    }

    #[test]
    fn test_select_returns_rows_and_columns() {
        let store = small_store();
        let result = execute(
            &store,
            &config(),
            "SELECT name, max_rent FROM guest_cards ORDER BY name",
        )
        .unwrap();

        assert_eq!(result.row_count(), 4);
        assert_eq!(result.columns.len(), 2);
        assert_eq!(result.columns[0].name, "name");
        assert_eq!(result.columns[0].data_type, "text");
        assert_eq!(result.columns[1].data_type, "real");
        assert_eq!(result.rows[0]["name"], "Chen, Wei");
    }

    #[test]
    fn test_trailing_semicolon_accepted() {
        let store = small_store();
        let result = execute(&store, &config(), "SELECT COUNT(*) AS c FROM nearby_units;").unwrap();
        assert_eq!(result.rows[0]["c"], 5);
    }

    #[test]
    fn test_mutation_keywords_rejected_any_case_any_position() {
        let store = small_store();
        let cases = [
            "INSERT INTO guest_cards VALUES (1)",
            "select * from guest_cards; DROP TABLE guest_cards",
            "SELECT * FROM guest_cards WHERE name = 'x' UNION SELECT 1 FROM t; DELETE FROM t",
            "SELECT name FROM guest_cards WHERE note = 'please UPDATE me'",
            "SELECT * FROM guest_cards WHERE 1=1 AnD dElEtE",
            "UPDATE guest_cards SET status = 'active'",
            "CREATE TABLE evil (x)",
            "SELECT alter FROM guest_cards",
        ];
        for query in cases {
            let err = execute(&store, &config(), query).unwrap_err();
            assert!(
                matches!(err, AnalyticsError::UnsafeQuery(_)),
                "expected UnsafeQuery for {:?}, got {:?}",
                query,
                err
            );
        }
    }

    #[test]
    fn test_multi_statement_rejected() {
        let store = small_store();
        let err = execute(
            &store,
            &config(),
            "SELECT 1; SELECT * FROM guest_cards",
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::UnsafeQuery(_)));
    }

    #[test]
    fn test_non_select_verbs_rejected() {
        let store = small_store();
        for query in ["WITH c AS (SELECT 1) SELECT * FROM c", "EXPLAIN SELECT 1", ""] {
            let err = execute(&store, &config(), query).unwrap_err();
            assert!(matches!(err, AnalyticsError::UnsafeQuery(_)), "{:?}", query);
        }
    }

    #[test]
    fn test_safe_but_invalid_query_is_syntax_error() {
        let store = small_store();
        let err = execute(&store, &config(), "SELECT FROM WHERE").unwrap_err();
        assert!(matches!(err, AnalyticsError::QuerySyntax(_)));

        let err = execute(&store, &config(), "SELECT * FROM no_such_table").unwrap_err();
        assert!(matches!(err, AnalyticsError::QuerySyntax(_)));
    }

    #[test]
    fn test_result_row_cap() {
        let store = small_store();
        let mut config = config();
        config.max_result_rows = 3;

        // 4x5 cross join produces 20 rows, over the cap of 3
        let err = execute(
            &store,
            &config,
            "SELECT g.name FROM guest_cards g, nearby_units u",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::ResultTooLarge { cap: 3, .. }
        ));
    }

    #[test]
    fn test_pathological_query_times_out() {
        // Enough rows that a five-way cross join cannot finish within 10ms.
        let rows: Vec<String> = (0..300)
            .map(|i| {
                format!(
                    r#""Prospect {i}",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,$8000,700"#
                )
            })
            .collect();
        let row_refs: Vec<&str> = rows.iter().map(|s| s.as_str()).collect();
        let guests = guest_csv(&row_refs);
        let units = unit_csv(&[r#"96%,2,1,905,near,01/10/2025,$2000,Zumper"#]);
        let store =
            TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap();

        let mut config = Config::default();
        config.query_timeout_ms = 10;

        let err = execute(
            &store,
            &config,
            "SELECT COUNT(*) FROM guest_cards a, guest_cards b, guest_cards c, guest_cards d, guest_cards e",
        )
        .unwrap_err();
        assert!(matches!(err, AnalyticsError::QueryTimeout(_)), "{:?}", err);
    }

    #[test]
    fn test_aggregates_allowed() {
        let store = small_store();
        let result = execute(
            &store,
            &config(),
            "SELECT AVG(advertised_rent) AS avg_rent, MIN(advertised_rent) AS lo FROM nearby_units",
        )
        .unwrap();
        assert_eq!(result.rows[0]["avg_rent"], 2400.0);
        assert_eq!(result.rows[0]["lo"], 2000.0);
    }
}
