use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chart::{self, ChartSpec};
use crate::db::result::Table;
use crate::db::source::DataSource;
use crate::error::AnalystError;
use crate::generator::QueryGenerator;
use crate::insight::{self, InsightGenerator};
use crate::llm::LlmManager;

/// Everything the consumer receives for one question. Presentation, history
/// and counters stay on the consumer's side.
#[derive(Debug)]
pub struct Answer {
    pub question: String,
    pub sql: Option<String>,
    pub result: Result<Table, AnalystError>,
    pub chart: Option<ChartSpec>,
    pub insight: String,
    pub explanation: Option<String>,
    pub followups: Vec<String>,
}

impl Answer {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Human-readable status line for the consumer.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(table) if table.is_empty() => {
                "Query executed successfully but returned no results.".to_string()
            }
            Ok(table) => format!(
                "Query executed successfully. Found {} result(s).",
                table.row_count()
            ),
            Err(e) => e.to_string(),
        }
    }

    fn failed(question: &str, sql: Option<String>, error: AnalystError) -> Self {
        Self {
            question: question.to_string(),
            sql,
            result: Err(error),
            chart: None,
            insight: String::new(),
            explanation: None,
            followups: Vec::new(),
        }
    }
}

/// The pipeline core: stateless between calls apart from the scoped
/// data-source connection. Not safe for overlapping executions.
pub struct Analyst {
    source: DataSource,
    generator: QueryGenerator,
    insights: InsightGenerator,
}

impl Analyst {
    pub fn new(source: DataSource, llm: Option<LlmManager>) -> Self {
        let llm = llm.map(Arc::new);
        Self {
            source,
            generator: QueryGenerator::new(llm.clone()),
            insights: InsightGenerator::new(llm),
        }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    /// Answer one question end to end: generate, validate, execute (with a
    /// single repair attempt on execution failure), then chart, insight,
    /// follow-ups and explanation.
    pub async fn ask(&self, question: &str) -> Answer {
        info!("Processing question: {}", question);

        let generated = match self.generator.generate(question, &self.source).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!("SQL generation failed: {}", e);
                return Answer::failed(question, None, e);
            }
        };

        let mut sql = generated.sql;
        let mut result = self.source.execute(&sql);

        // Execution failures get exactly one repair attempt. Anything going
        // wrong in repair surfaces the original error unchanged.
        let exec_failure = match &result {
            Err(AnalystError::Execution(message)) => Some(message.clone()),
            _ => None,
        };
        if let Some(exec_message) = exec_failure {
            debug!("Execution failed, attempting one repair: {}", exec_message);
            match self
                .generator
                .repair(&sql, &exec_message, question, &self.source)
                .await
            {
                Ok(repaired) => match self.source.execute(&repaired.sql) {
                    Ok(table) => {
                        info!("Repaired query succeeded");
                        sql = repaired.sql;
                        result = Ok(table);
                    }
                    Err(e) => {
                        debug!("Repaired query also failed: {}", e);
                    }
                },
                Err(e) => {
                    debug!("Repair attempt failed: {}", e);
                }
            }
        }

        let table = match result {
            Ok(table) => table,
            Err(e) => {
                warn!("Query failed: {}", e);
                return Answer::failed(question, Some(sql), e);
            }
        };

        let chart = chart::select_chart(&table, question);
        let insight = self.insights.analyze(&sql, &table).await;
        let followups = insight::suggest_followups(&sql, &table);
        let explanation = Some(self.generator.explain(&sql).await);

        Answer {
            question: question.to_string(),
            sql: Some(sql),
            result: Ok(table),
            chart,
            insight,
            explanation,
            followups,
        }
    }
}
