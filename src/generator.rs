use std::sync::Arc;
use tracing::{debug, info};

use crate::db::source::DataSource;
use crate::error::AnalystError;
use crate::llm::LlmManager;

const GENERATION_SYSTEM_ROLE: &str =
    "You are an expert SQL analyst. Convert natural language questions to SQL queries.";
const REPAIR_SYSTEM_ROLE: &str =
    "You are an expert SQL developer. Fix the provided SQL query based on the error message.";
const EXPLAIN_SYSTEM_ROLE: &str =
    "You are a data analyst who explains SQL queries in simple business terms.";

const NO_MODEL_MESSAGE: &str =
    "No language model configured. Set llm.api_key or the LLM_API_KEY environment variable.";
const CANNOT_EXPLAIN_MESSAGE: &str = "Cannot explain query: no language model configured.";

/// A candidate query produced by the model. Queries are only executed once
/// `validated` is set.
#[derive(Debug, Clone)]
pub struct GeneratedQuery {
    pub sql: String,
    pub validated: bool,
}

pub struct QueryGenerator {
    llm: Option<Arc<LlmManager>>,
}

impl QueryGenerator {
    pub fn new(llm: Option<Arc<LlmManager>>) -> Self {
        Self { llm }
    }

    /// Turn a natural-language question into a validated SQL candidate.
    /// The schema context is rebuilt on every call so it always reflects the
    /// data source's current structure.
    pub async fn generate(
        &self,
        question: &str,
        source: &DataSource,
    ) -> Result<GeneratedQuery, AnalystError> {
        let llm = self.require_model()?;

        let schema = source.describe_schema()?;
        let system = generation_prompt(&schema.render());

        info!("Generating SQL for question: {}", question);
        let reply = llm.complete(&system, question, 0.0, 500).await?;
        let sql = clean_sql(&reply);
        debug!("Candidate SQL: {}", sql);

        self.validated(sql, source)
    }

    /// One-shot repair of a failed query. The repaired candidate goes through
    /// the same validation gate as initial generation; callers surface the
    /// original execution error when this fails.
    pub async fn repair(
        &self,
        original: &str,
        execution_error: &str,
        question: &str,
        source: &DataSource,
    ) -> Result<GeneratedQuery, AnalystError> {
        let llm = self.require_model()?;

        let schema = source.describe_schema()?;
        let user = format!(
            "The following SQL query failed with an error. Please fix it.\n\n\
             Original question: {}\n\
             Failed SQL: {}\n\
             Error: {}\n\n\
             Database schema:\n{}\n\n\
             Generate a corrected SQL query that addresses the error:",
            question,
            original,
            execution_error,
            schema.render()
        );

        info!("Attempting to repair failed SQL");
        let reply = llm.complete(REPAIR_SYSTEM_ROLE, &user, 0.0, 500).await?;
        let sql = clean_sql(&reply);
        debug!("Repaired SQL candidate: {}", sql);

        self.validated(sql, source)
    }

    /// Plain-language paraphrase of a query. Degrades to a fixed message
    /// without a model and to an error description on transport failure.
    pub async fn explain(&self, sql: &str) -> String {
        let Some(llm) = self.llm.as_ref() else {
            return CANNOT_EXPLAIN_MESSAGE.to_string();
        };

        let user = format!(
            "Explain what this SQL query does in simple, business-friendly language:\n\n{}\n\n\
             Provide a clear, concise explanation that a non-technical person would understand.",
            sql
        );

        match llm.complete(EXPLAIN_SYSTEM_ROLE, &user, 0.3, 200).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => format!("Error explaining query: {}", e),
        }
    }

    fn require_model(&self) -> Result<&Arc<LlmManager>, AnalystError> {
        self.llm
            .as_ref()
            .ok_or_else(|| AnalystError::Configuration(NO_MODEL_MESSAGE.to_string()))
    }

    fn validated(&self, sql: String, source: &DataSource) -> Result<GeneratedQuery, AnalystError> {
        let (ok, message) = source.validate(&sql);
        if !ok {
            return Err(AnalystError::GenerationInvalid(format!(
                "Generated SQL validation failed: {}",
                message
            )));
        }
        Ok(GeneratedQuery {
            sql,
            validated: true,
        })
    }
}

fn generation_prompt(schema_text: &str) -> String {
    format!(
        "{}\n\n\
         IMPORTANT RULES:\n\
         1. Only generate SELECT queries (no INSERT, UPDATE, DELETE)\n\
         2. Always use proper SQL syntax for DuckDB\n\
         3. Include appropriate WHERE, GROUP BY, ORDER BY clauses as needed\n\
         4. Limit results to 100 rows maximum\n\
         5. Use table and column names exactly as provided in the schema\n\n\
         Available tables and schema:\n{}\n\n\
         Generate only the SQL query without explanations or markdown formatting.",
        GENERATION_SYSTEM_ROLE, schema_text
    )
}

/// Strip markdown fences and stray backticks the model may still emit.
fn clean_sql(content: &str) -> String {
    if let Some(start) = content.find("```sql") {
        if let Some(end) = content.rfind("```") {
            if end > start + 6 {
                return content[start + 6..end].trim().replace('`', "");
            }
        }
    }
    if let Some(start) = content.find("```") {
        let after = &content[start + 3..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().replace('`', "");
        }
    }
    content.trim().replace('`', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sql_fences() {
        let reply = "```sql\nSELECT * FROM orders\n```";
        assert_eq!(clean_sql(reply), "SELECT * FROM orders");
    }

    #[test]
    fn strips_bare_fences() {
        let reply = "```\nSELECT 1\n```";
        assert_eq!(clean_sql(reply), "SELECT 1");
    }

    #[test]
    fn strips_fences_with_surrounding_prose() {
        let reply = "Here you go:\n```sql\nSELECT name FROM customers\n```\nLet me know!";
        assert_eq!(clean_sql(reply), "SELECT name FROM customers");
    }

    #[test]
    fn unfenced_output_is_trimmed() {
        assert_eq!(clean_sql("  SELECT 1  \n"), "SELECT 1");
    }

    #[test]
    fn stray_backticks_are_removed() {
        assert_eq!(
            clean_sql("SELECT `amount` FROM orders"),
            "SELECT amount FROM orders"
        );
    }

    #[tokio::test]
    async fn generation_without_model_is_a_configuration_error() {
        let source = DataSource::open_in_memory().unwrap();
        let generator = QueryGenerator::new(None);

        let err = generator.generate("how many rows?", &source).await.unwrap_err();
        assert!(matches!(err, AnalystError::Configuration(_)));
    }

    #[tokio::test]
    async fn repair_without_model_is_a_configuration_error() {
        let source = DataSource::open_in_memory().unwrap();
        let generator = QueryGenerator::new(None);

        let err = generator
            .repair("SELECT 1", "boom", "how many rows?", &source)
            .await
            .unwrap_err();
        assert!(matches!(err, AnalystError::Configuration(_)));
    }

    #[tokio::test]
    async fn explain_without_model_degrades_to_fixed_message() {
        let generator = QueryGenerator::new(None);
        assert_eq!(
            generator.explain("SELECT 1").await,
            CANNOT_EXPLAIN_MESSAGE
        );
    }
}
