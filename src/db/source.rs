use duckdb::Connection;
use tracing::{debug, info};

use crate::db::result::{Table, Value};
use crate::db::schema::SchemaDescription;
use crate::error::AnalystError;

/// Statements containing any of these anywhere are rejected outright, even
/// inside string literals or aliases. Over-conservative on purpose.
const FORBIDDEN_KEYWORDS: [&str; 7] = [
    "DROP", "DELETE", "UPDATE", "INSERT", "ALTER", "CREATE", "TRUNCATE",
];

/// Cap appended to queries that carry no row-limiting clause of their own.
pub const MAX_QUERY_ROWS: usize = 100;

/// A scoped connection to one DuckDB database. One source serves one logical
/// session; callers must not issue overlapping executions on it.
pub struct DataSource {
    conn: Connection,
}

impl DataSource {
    pub fn open(path: &str) -> Result<Self, AnalystError> {
        let conn =
            Connection::open(path).map_err(|e| AnalystError::DataSource(e.to_string()))?;
        info!("Opened database at {}", path);
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, AnalystError> {
        let conn =
            Connection::open_in_memory().map_err(|e| AnalystError::DataSource(e.to_string()))?;
        Ok(Self { conn })
    }

    /// Raw connection handle, for setup and ingest glue outside the pipeline.
    /// Statements issued here bypass the read-only policy.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn describe_schema(&self) -> Result<SchemaDescription, AnalystError> {
        SchemaDescription::introspect(&self.conn)
    }

    /// Execute a query under the read-only policy and return its rows.
    /// A successful query with zero rows is `Ok`, not an error.
    pub fn execute(&self, query: &str) -> Result<Table, AnalystError> {
        check_policy(query)?;

        let mut sql = query.trim().trim_end_matches(';').trim().to_string();
        if !sql.to_uppercase().contains("LIMIT") {
            sql.push_str(&format!(" LIMIT {}", MAX_QUERY_ROWS));
        }
        debug!("Executing SQL: {}", sql);

        let mut stmt = self
            .conn
            .prepare(&sql)
            .map_err(|e| AnalystError::Execution(e.to_string()))?;

        let column_count = stmt.column_count();
        let mut columns = Vec::with_capacity(column_count);
        for i in 0..column_count {
            if let Ok(name) = stmt.column_name(i) {
                columns.push(name.to_string());
            }
        }

        let mut table_rows = Vec::new();
        let mut rows = stmt
            .query([])
            .map_err(|e| AnalystError::Execution(e.to_string()))?;
        loop {
            match rows.next() {
                Ok(Some(row)) => {
                    let mut values = Vec::with_capacity(column_count);
                    for i in 0..column_count {
                        let value = row.get_ref(i).map(Value::from).unwrap_or(Value::Null);
                        values.push(value);
                    }
                    table_rows.push(values);
                }
                Ok(None) => break,
                Err(e) => return Err(AnalystError::Execution(e.to_string())),
            }
        }

        Ok(Table::new(columns, table_rows))
    }

    /// Policy checks plus an EXPLAIN dry-run that never materializes rows.
    /// Idempotent for a fixed query and unchanged schema.
    pub fn validate(&self, query: &str) -> (bool, String) {
        if let Err(e) = check_policy(query) {
            let message = match e {
                AnalystError::Forbidden(msg) => msg,
                other => other.to_string(),
            };
            return (false, message);
        }

        let dry_run = format!("EXPLAIN {}", query.trim().trim_end_matches(';'));
        let outcome = self
            .conn
            .prepare(&dry_run)
            .and_then(|mut stmt| stmt.query([]).map(|_| ()));
        match outcome {
            Ok(()) => (true, "Query is valid.".to_string()),
            Err(e) => (false, format!("SQL syntax error: {}", e)),
        }
    }
}

fn check_policy(query: &str) -> Result<(), AnalystError> {
    let upper = query.trim().to_uppercase();

    if !upper.starts_with("SELECT") {
        return Err(AnalystError::Forbidden(
            "Query must start with SELECT. Only SELECT queries are allowed.".to_string(),
        ));
    }

    for keyword in FORBIDDEN_KEYWORDS {
        if upper.contains(keyword) {
            return Err(AnalystError::Forbidden(format!(
                "Forbidden keyword '{}' detected. Only SELECT queries are allowed.",
                keyword
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_source() -> DataSource {
        let source = DataSource::open_in_memory().unwrap();
        source
            .conn
            .execute_batch(
                "CREATE TABLE orders (id INTEGER, amount DOUBLE, placed_on VARCHAR);
                 INSERT INTO orders VALUES (1, 10.5, '2024-01-01'), (2, 20.0, '2024-01-02');",
            )
            .unwrap();
        source
    }

    #[test]
    fn rejects_non_select_statements() {
        let source = seeded_source();
        let err = source.execute("SHOW TABLES").unwrap_err();
        assert!(matches!(err, AnalystError::Forbidden(_)));
    }

    #[test]
    fn rejects_mutating_keywords_anywhere_in_the_text() {
        let source = seeded_source();
        for query in [
            "DELETE FROM orders",
            "select * from orders; drop table orders",
            "SELECT 'please update me' AS note",
        ] {
            let err = source.execute(query).unwrap_err();
            assert!(matches!(err, AnalystError::Forbidden(_)), "{}", query);
        }
    }

    #[test]
    fn select_prefix_check_is_case_insensitive_and_trimmed() {
        let source = seeded_source();
        assert!(source.execute("  select id from orders").is_ok());
    }

    #[test]
    fn appends_row_cap_when_no_limit_present() {
        let source = seeded_source();
        let table = source.execute("SELECT * FROM range(250)").unwrap();
        assert_eq!(table.row_count(), MAX_QUERY_ROWS);
    }

    #[test]
    fn existing_limit_clause_is_left_alone() {
        let source = seeded_source();
        let table = source.execute("SELECT * FROM range(250) LIMIT 5").unwrap();
        assert_eq!(table.row_count(), 5);

        let lowercase = source.execute("select * from range(250) limit 7").unwrap();
        assert_eq!(lowercase.row_count(), 7);
    }

    #[test]
    fn zero_rows_is_success_not_failure() {
        let source = seeded_source();
        let table = source
            .execute("SELECT id FROM orders WHERE id > 100")
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns(), ["id".to_string()]);
    }

    #[test]
    fn native_errors_are_remapped_with_message_preserved() {
        let source = seeded_source();
        let err = source.execute("SELECT * FROM missing_table").unwrap_err();
        match err {
            AnalystError::Execution(msg) => assert!(msg.contains("missing_table")),
            other => panic!("expected execution error, got {:?}", other),
        }
    }

    #[test]
    fn validate_reports_forbidden_keyword_by_name() {
        let source = seeded_source();
        let (ok, message) = source.validate("SELECT * FROM orders; DROP TABLE orders");
        assert!(!ok);
        assert_eq!(
            message,
            "Forbidden keyword 'DROP' detected. Only SELECT queries are allowed."
        );
    }

    #[test]
    fn validate_accepts_a_clean_select() {
        let source = seeded_source();
        let (ok, message) = source.validate("SELECT id, amount FROM orders");
        assert!(ok);
        assert_eq!(message, "Query is valid.");
    }

    #[test]
    fn validate_dry_run_catches_binder_errors() {
        let source = seeded_source();
        let (ok, message) = source.validate("SELECT nope FROM orders");
        assert!(!ok);
        assert!(message.starts_with("SQL syntax error:"));
    }

    #[test]
    fn validate_is_idempotent() {
        let source = seeded_source();
        let query = "SELECT id FROM orders";
        assert_eq!(source.validate(query), source.validate(query));

        let bad = "SELECT * FROM orders WHERE";
        assert_eq!(source.validate(bad), source.validate(bad));
    }

    #[test]
    fn execution_returns_typed_values() {
        let source = seeded_source();
        let table = source
            .execute("SELECT id, amount, placed_on FROM orders ORDER BY id")
            .unwrap();
        assert_eq!(table.rows()[0][0], Value::Int(1));
        assert_eq!(table.rows()[0][1], Value::Float(10.5));
        assert_eq!(table.rows()[0][2], Value::Text("2024-01-01".to_string()));
    }
}

#[cfg(test)]
mod _diag {
    use duckdb::Connection;
    #[test]
    fn diag_probe() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t(a INTEGER); INSERT INTO t VALUES (1),(2);").unwrap();
        eprintln!("DIAG batch ok");
        let mut stmt = conn.prepare("SELECT a FROM t").unwrap();
        eprintln!("DIAG prepared, col_count={}", stmt.column_count());
        let mut rows = stmt.query([]).unwrap();
        eprintln!("DIAG query ok");
        let r = rows.next();
        eprintln!("DIAG first next = {:?}", r.is_ok());
    }
}
