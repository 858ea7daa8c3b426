use serde::Serialize;

use crate::db::result::{ColumnKind, Table};

/// Keywords in the question that favor a pie chart for small categorical
/// results.
const PIE_KEYWORDS: [&str; 4] = ["percentage", "share", "proportion", "distribution"];

const MAX_CHART_ROWS: usize = 50;
const MAX_PIE_ROWS: usize = 10;

/// A renderable chart choice: the selected type plus its column bindings.
/// Rendering itself belongs to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSpec {
    Bar { x: String, y: String },
    Line { x: String, y: String },
    Pie { names: String, values: String },
    Scatter { x: String, y: String },
    Table { height: u32 },
}

/// Pick a chart for a result. Rules are evaluated in strict order; the first
/// match wins. Returns `None` for results with no rows or no columns.
pub fn select_chart(table: &Table, question: &str) -> Option<ChartSpec> {
    if table.is_empty() || table.column_count() == 0 {
        return None;
    }

    let kinds = table.column_kinds();
    let numeric_count = kinds.iter().filter(|k| **k == ColumnKind::Numeric).count();
    let has_text = kinds.iter().any(|k| *k == ColumnKind::Text);
    let has_date = kinds.iter().any(|k| *k == ColumnKind::Date);
    let rows = table.row_count();

    // Too many rows for an effective chart.
    if rows > MAX_CHART_ROWS {
        return Some(table_spec(table));
    }

    if numeric_count == 0 {
        return Some(table_spec(table));
    }

    if has_date {
        return Some(line_chart(table, &kinds));
    }

    if numeric_count == 1 && has_text {
        let lowered = question.to_lowercase();
        if rows <= MAX_PIE_ROWS && PIE_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            return Some(pie_chart(table, &kinds));
        }
        return Some(bar_chart(table, &kinds));
    }

    if numeric_count >= 2 {
        return Some(scatter_plot(table, &kinds));
    }

    Some(table_spec(table))
}

/// One-sentence description of the selected chart.
pub fn chart_summary(spec: &ChartSpec, table: &Table) -> String {
    let rows = table.row_count();
    match spec {
        ChartSpec::Bar { .. } => format!(
            "Bar chart showing {} categories with their corresponding values.",
            rows
        ),
        ChartSpec::Line { .. } => {
            format!("Line chart displaying trends across {} data points.", rows)
        }
        ChartSpec::Pie { .. } => format!(
            "Pie chart showing the distribution across {} categories.",
            rows
        ),
        ChartSpec::Scatter { .. } => format!(
            "Scatter plot comparing two variables across {} data points.",
            rows
        ),
        ChartSpec::Table { .. } => format!(
            "Data table with {} rows and {} columns.",
            rows,
            table.column_count()
        ),
    }
}

fn first_of_kind(table: &Table, kinds: &[ColumnKind], kind: ColumnKind) -> Option<String> {
    table
        .columns()
        .iter()
        .zip(kinds)
        .find(|(_, k)| **k == kind)
        .map(|(name, _)| name.clone())
}

fn bar_chart(table: &Table, kinds: &[ColumnKind]) -> ChartSpec {
    let Some(y) = first_of_kind(table, kinds, ColumnKind::Numeric) else {
        return table_spec(table);
    };
    let x = first_of_kind(table, kinds, ColumnKind::Text)
        .or_else(|| table.columns().first().cloned())
        .unwrap_or_default();
    ChartSpec::Bar { x, y }
}

fn line_chart(table: &Table, kinds: &[ColumnKind]) -> ChartSpec {
    let Some(y) = first_of_kind(table, kinds, ColumnKind::Numeric) else {
        return table_spec(table);
    };
    let x = first_of_kind(table, kinds, ColumnKind::Date)
        .or_else(|| table.columns().first().cloned())
        .unwrap_or_default();
    ChartSpec::Line { x, y }
}

fn pie_chart(table: &Table, kinds: &[ColumnKind]) -> ChartSpec {
    let (Some(names), Some(values)) = (
        first_of_kind(table, kinds, ColumnKind::Text),
        first_of_kind(table, kinds, ColumnKind::Numeric),
    ) else {
        return bar_chart(table, kinds);
    };
    ChartSpec::Pie { names, values }
}

fn scatter_plot(table: &Table, kinds: &[ColumnKind]) -> ChartSpec {
    let numerics: Vec<&String> = table
        .columns()
        .iter()
        .zip(kinds)
        .filter(|(_, k)| **k == ColumnKind::Numeric)
        .map(|(name, _)| name)
        .collect();
    if numerics.len() < 2 {
        return bar_chart(table, kinds);
    }
    ChartSpec::Scatter {
        x: numerics[0].clone(),
        y: numerics[1].clone(),
    }
}

fn table_spec(table: &Table) -> ChartSpec {
    // Height grows with the row count, capped for very tall results.
    let height = std::cmp::min(400, 50 + 30 * table.row_count()) as u32;
    ChartSpec::Table { height }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::result::Value;

    fn table_of(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    fn month_revenue(rows: usize) -> Table {
        table_of(
            &["month", "revenue"],
            (0..rows)
                .map(|i| {
                    vec![
                        Value::Text(format!("Month {}", i + 1)),
                        Value::Float(100.0 + i as f64),
                    ]
                })
                .collect(),
        )
    }

    #[test]
    fn empty_result_selects_nothing() {
        let table = Table::empty(vec!["a".to_string()]);
        assert_eq!(select_chart(&table, "anything"), None);
    }

    #[test]
    fn row_cap_precedes_every_other_rule() {
        let table = table_of(
            &["x", "y"],
            (0..60)
                .map(|i| vec![Value::Int(i), Value::Int(i * 2)])
                .collect(),
        );
        // Two numeric columns would scatter, but 60 rows forces a table.
        assert_eq!(
            select_chart(&table, "compare x and y"),
            Some(ChartSpec::Table { height: 400 })
        );
    }

    #[test]
    fn no_numeric_columns_means_table() {
        let table = table_of(
            &["name", "city"],
            vec![vec![
                Value::Text("Alice".to_string()),
                Value::Text("Leeds".to_string()),
            ]],
        );
        assert!(matches!(
            select_chart(&table, "list customers"),
            Some(ChartSpec::Table { .. })
        ));
    }

    #[test]
    fn date_column_with_numeric_selects_line() {
        let table = table_of(
            &["day", "total"],
            vec![
                vec![Value::Text("2024-01-01".to_string()), Value::Int(10)],
                vec![Value::Text("2024-01-02".to_string()), Value::Int(12)],
            ],
        );
        assert_eq!(
            select_chart(&table, "totals per day"),
            Some(ChartSpec::Line {
                x: "day".to_string(),
                y: "total".to_string()
            })
        );
    }

    #[test]
    fn categorical_single_numeric_selects_bar() {
        let table = month_revenue(6);
        assert_eq!(
            select_chart(&table, "Show me total sales by month"),
            Some(ChartSpec::Bar {
                x: "month".to_string(),
                y: "revenue".to_string()
            })
        );
    }

    #[test]
    fn distribution_wording_with_few_rows_selects_pie() {
        let table = month_revenue(6);
        assert_eq!(
            select_chart(&table, "show revenue distribution percentage by month"),
            Some(ChartSpec::Pie {
                names: "month".to_string(),
                values: "revenue".to_string()
            })
        );
    }

    #[test]
    fn distribution_wording_with_many_rows_still_selects_bar() {
        let table = month_revenue(12);
        assert!(matches!(
            select_chart(&table, "show revenue distribution by month"),
            Some(ChartSpec::Bar { .. })
        ));
    }

    #[test]
    fn two_numeric_columns_select_scatter() {
        let table = table_of(
            &["price", "quantity"],
            vec![
                vec![Value::Float(9.99), Value::Int(3)],
                vec![Value::Float(4.50), Value::Int(11)],
            ],
        );
        assert_eq!(
            select_chart(&table, "price vs quantity"),
            Some(ChartSpec::Scatter {
                x: "price".to_string(),
                y: "quantity".to_string()
            })
        );
    }

    #[test]
    fn lone_numeric_column_falls_through_to_table() {
        let table = table_of(&["total"], vec![vec![Value::Int(42)]]);
        assert!(matches!(
            select_chart(&table, "what is the total"),
            Some(ChartSpec::Table { .. })
        ));
    }

    #[test]
    fn table_height_is_proportional_and_capped() {
        let small = table_of(&["total"], vec![vec![Value::Int(1)]; 2]);
        assert_eq!(table_spec(&small), ChartSpec::Table { height: 110 });

        let tall = table_of(&["total"], vec![vec![Value::Int(1)]; 40]);
        assert_eq!(table_spec(&tall), ChartSpec::Table { height: 400 });
    }

    #[test]
    fn summaries_mention_shape() {
        let table = month_revenue(3);
        let spec = ChartSpec::Bar {
            x: "month".to_string(),
            y: "revenue".to_string(),
        };
        assert_eq!(
            chart_summary(&spec, &table),
            "Bar chart showing 3 categories with their corresponding values."
        );

        let table_chart = ChartSpec::Table { height: 140 };
        assert_eq!(
            chart_summary(&table_chart, &table),
            "Data table with 3 rows and 2 columns."
        );
    }
}
