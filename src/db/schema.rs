use duckdb::Connection;
use tracing::{debug, warn};

use crate::db::result::Value;
use crate::error::AnalystError;

const SAMPLE_ROW_LIMIT: usize = 3;

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Up to three sample rows, each an ordered column -> rendered value map.
    pub sample_rows: Vec<Vec<(String, String)>>,
}

/// Snapshot of the data source's structure, built fresh per generation
/// request so it always reflects the current schema.
#[derive(Debug, Clone)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescription {
    pub(crate) fn introspect(conn: &Connection) -> Result<Self, AnalystError> {
        let table_names = list_tables(conn)?;
        debug!("Introspecting {} tables", table_names.len());

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = describe_columns(conn, &name)?;
            let sample_rows = match fetch_sample_rows(conn, &name) {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Could not read sample rows for table {}: {}", name, e);
                    Vec::new()
                }
            };
            tables.push(TableDescriptor {
                name,
                columns,
                sample_rows,
            });
        }

        Ok(Self { tables })
    }

    /// Deterministic textual rendering used verbatim as generation context.
    pub fn render(&self) -> String {
        let mut blocks = Vec::with_capacity(self.tables.len());
        for table in &self.tables {
            let mut lines = vec![format!("Table: {}", table.name)];
            for column in &table.columns {
                let null_str = if column.nullable { "NULL" } else { "NOT NULL" };
                lines.push(format!(
                    "  - {}: {} ({})",
                    column.name, column.data_type, null_str
                ));
            }
            if !table.sample_rows.is_empty() {
                lines.push("  Sample data:".to_string());
                for row in &table.sample_rows {
                    let pairs: Vec<String> = row
                        .iter()
                        .map(|(name, value)| format!("{}: {}", name, value))
                        .collect();
                    lines.push(format!("    {{{}}}", pairs.join(", ")));
                }
            }
            blocks.push(lines.join("\n"));
        }
        blocks.join("\n\n")
    }
}

fn list_tables(conn: &Connection) -> Result<Vec<String>, AnalystError> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table'")
        .map_err(|e| AnalystError::DataSource(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(|e| AnalystError::DataSource(e.to_string()))?;
    Ok(rows.filter_map(Result::ok).collect())
}

fn describe_columns(conn: &Connection, table: &str) -> Result<Vec<ColumnDescriptor>, AnalystError> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info(\"{}\")", table))
        .map_err(|e| AnalystError::DataSource(e.to_string()))?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ColumnDescriptor {
                name: row.get(1)?,
                data_type: row.get(2)?,
                nullable: !row.get::<_, bool>(3)?,
            })
        })
        .map_err(|e| AnalystError::DataSource(e.to_string()))?;
    Ok(rows.filter_map(Result::ok).collect())
}

fn fetch_sample_rows(
    conn: &Connection,
    table: &str,
) -> Result<Vec<Vec<(String, String)>>, duckdb::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT * FROM \"{}\" LIMIT {}",
        table, SAMPLE_ROW_LIMIT
    ))?;

    let column_count = stmt.column_count();
    let mut column_names = Vec::with_capacity(column_count);
    for i in 0..column_count {
        if let Ok(name) = stmt.column_name(i) {
            column_names.push(name.to_string());
        }
    }

    let mut samples = Vec::new();
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let mut rendered = Vec::with_capacity(column_count);
        for (i, name) in column_names.iter().enumerate() {
            let value = row
                .get_ref(i)
                .map(Value::from)
                .unwrap_or(Value::Null);
            rendered.push((name.clone(), value.to_string()));
        }
        samples.push(rendered);
    }
    Ok(samples)
}
