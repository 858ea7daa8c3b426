use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::result::{ColumnKind, Table, Value};
use crate::llm::LlmManager;

const ANALYST_SYSTEM_ROLE: &str =
    "You are a business analyst who provides actionable insights from data.";

const NO_DATA_MESSAGE: &str = "No data returned from the query. Consider adjusting your question \
                               or checking if the data exists.";

/// Narrates query results: an AI 3-part summary when a model is configured,
/// otherwise a deterministic statistical digest.
pub struct InsightGenerator {
    llm: Option<Arc<LlmManager>>,
}

impl InsightGenerator {
    pub fn new(llm: Option<Arc<LlmManager>>) -> Self {
        Self { llm }
    }

    pub async fn analyze(&self, sql: &str, table: &Table) -> String {
        if table.is_empty() {
            return NO_DATA_MESSAGE.to_string();
        }

        let Some(llm) = self.llm.as_ref() else {
            debug!("No model configured, using statistical fallback");
            return basic_insights(table);
        };

        let user = format!(
            "Analyze the following SQL query results and provide business insights in plain English.\n\n\
             Query: {}\n\
             Results: {}\n\n\
             Provide:\n\
             1. A summary of what the data shows\n\
             2. Key insights or patterns\n\
             3. Business implications (if any)\n\n\
             Keep the response concise and actionable.",
            sql,
            data_summary(table)
        );

        info!("Requesting AI insights for {} result rows", table.row_count());
        match llm.complete(ANALYST_SYSTEM_ROLE, &user, 0.3, 400).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => format!("Error generating AI insights: {}\n\n{}", e, basic_insights(table)),
        }
    }
}

/// Bounded textual digest of a result handed to the model: full table when
/// small, first five rows otherwise, plus numeric column ranges.
fn data_summary(table: &Table) -> String {
    let mut parts = vec![
        format!(
            "Dataset contains {} rows and {} columns.",
            table.row_count(),
            table.column_count()
        ),
        format!("Columns: {}", table.columns().join(", ")),
    ];

    let shown = if table.row_count() <= 10 {
        parts.push("All data:".to_string());
        table.rows()
    } else {
        parts.push("Sample data (first 5 rows):".to_string());
        &table.rows()[..5]
    };
    parts.push(table.columns().join(" | "));
    for row in shown {
        let cells: Vec<String> = row.iter().map(Value::to_string).collect();
        parts.push(cells.join(" | "));
    }

    let kinds = table.column_kinds();
    let numeric_stats: Vec<String> = table
        .columns()
        .iter()
        .enumerate()
        .filter(|(i, _)| kinds[*i] == ColumnKind::Numeric)
        .filter_map(|(i, name)| {
            column_stats(table, i).map(|s| {
                format!("{}: min={:.2}, max={:.2}, mean={:.2}", name, s.min, s.max, s.mean)
            })
        })
        .collect();
    if !numeric_stats.is_empty() {
        parts.push("\nNumeric column statistics:".to_string());
        parts.extend(numeric_stats);
    }

    parts.join("\n")
}

/// Deterministic fallback used when no model is configured or a call fails.
fn basic_insights(table: &Table) -> String {
    let mut insights = vec!["Basic data analysis:".to_string()];

    let row_count = table.row_count();
    if row_count == 1 {
        insights.push("- Found exactly 1 result".to_string());
    } else {
        insights.push(format!("- Found {} results", row_count));
    }

    let kinds = table.column_kinds();

    for (i, name) in table.columns().iter().enumerate() {
        if kinds[i] != ColumnKind::Numeric {
            continue;
        }
        if let Some(stats) = column_stats(table, i) {
            insights.push(format!(
                "- {}: Total = {}, Average = {}",
                title_case(name),
                format_number(stats.sum),
                format_number(stats.mean)
            ));
            if stats.max != stats.min {
                insights.push(format!(
                    "  - Range: {} to {}",
                    format_number(stats.min),
                    format_number(stats.max)
                ));
            }
        }
    }

    for (i, name) in table.columns().iter().enumerate() {
        if kinds[i] != ColumnKind::Text {
            continue;
        }
        let distinct = table.distinct_text_count(i);
        if distinct <= 1 {
            continue;
        }
        insights.push(format!("- {}: {} unique values", title_case(name), distinct));
        if distinct <= 5 {
            let top = top_values(table, i, 3);
            let rendered: Vec<String> = top
                .iter()
                .map(|(value, count)| format!("{} ({})", value, count))
                .collect();
            insights.push(format!("  - Most common: {}", rendered.join(", ")));
        }
    }

    let missing = table.missing_count();
    if missing > 0 {
        insights.push(format!("- Found {} missing values in the dataset", missing));
    }

    insights.join("\n")
}

/// Heuristic follow-up questions for the current result. Never model-backed.
pub fn suggest_followups(_query: &str, table: &Table) -> Vec<String> {
    if table.is_empty() {
        return vec![
            "Try a different time period".to_string(),
            "Check if the data exists".to_string(),
            "Verify table and column names".to_string(),
        ];
    }

    let kinds = table.column_kinds();
    let mut suggestions = Vec::new();

    let first_numeric = table
        .columns()
        .iter()
        .enumerate()
        .find(|(i, _)| kinds[*i] == ColumnKind::Numeric)
        .map(|(_, name)| name.clone());

    if table.row_count() > 1 {
        if let Some(numeric) = &first_numeric {
            suggestions.push(format!("Show average {} by category", numeric));
            suggestions.push(format!("Find the top 5 highest {} values", numeric));
        }
    }

    if let Some((i, name)) = table
        .columns()
        .iter()
        .enumerate()
        .find(|(i, _)| kinds[*i] == ColumnKind::Text)
    {
        if table.distinct_text_count(i) > 1 {
            suggestions.push(format!("Filter results by {}", name));
        }
    }

    for name in table.columns() {
        let lower = name.to_lowercase();
        if lower.contains("date") || lower.contains("time") {
            suggestions.push("Show trends over time".to_string());
            suggestions.push("Compare this month vs last month".to_string());
            break;
        }
    }

    suggestions.extend(
        [
            "Show me the total count",
            "Group results by category",
            "Find the minimum and maximum values",
        ]
        .map(String::from),
    );

    suggestions.truncate(5);
    suggestions
}

struct ColumnStats {
    sum: f64,
    mean: f64,
    min: f64,
    max: f64,
}

fn column_stats(table: &Table, index: usize) -> Option<ColumnStats> {
    let values: Vec<f64> = table
        .column_values(index)
        .filter_map(Value::as_f64)
        .collect();
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Some(ColumnStats {
        sum,
        mean: sum / values.len() as f64,
        min,
        max,
    })
}

/// Top `limit` values by frequency, ties broken by first appearance.
fn top_values(table: &Table, index: usize, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for value in table.column_values(index) {
        if let Some(text) = value.as_text() {
            let entry = counts.entry(text).or_insert(0);
            if *entry == 0 {
                order.push(text);
            }
            *entry += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|text| (text.to_string(), counts[text]))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

/// "unit_price" -> "Unit Price"
fn title_case(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Thousands separators with two decimals: 1234567.5 -> "1,234,567.50"
fn format_number(value: f64) -> String {
    let formatted = format!("{:.2}", value.abs());
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}
