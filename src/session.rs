use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chart::ChartSpec;
use crate::db::result::Table;
use crate::pipeline::Answer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry in the conversation log. Turns are never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub sql: Option<String>,
    pub table: Option<Table>,
    pub chart: Option<ChartSpec>,
    pub success: bool,
}

/// Append-only conversation state, owned by the consumer and passed
/// explicitly. Lives only as long as the process.
#[derive(Debug, Default)]
pub struct ChatSession {
    turns: Vec<ChatTurn>,
    query_count: usize,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: &str) {
        self.turns.push(ChatTurn {
            role: Role::User,
            content: content.to_string(),
            timestamp: Utc::now(),
            sql: None,
            table: None,
            chart: None,
            success: true,
        });
    }

    /// Record an assistant turn for a finished answer. Successful answers
    /// bump the processed-query counter.
    pub fn push_answer(&mut self, answer: &Answer) {
        let mut content = vec![answer.message()];
        if let Some(explanation) = &answer.explanation {
            content.push(format!("What this query does: {}", explanation));
        }
        if !answer.insight.is_empty() {
            content.push(format!("Insights:\n{}", answer.insight));
        }
        if !answer.followups.is_empty() {
            let bullets: Vec<String> = answer
                .followups
                .iter()
                .map(|s| format!("- {}", s))
                .collect();
            content.push(format!("Suggested follow-up questions:\n{}", bullets.join("\n")));
        }

        self.turns.push(ChatTurn {
            role: Role::Assistant,
            content: content.join("\n\n"),
            timestamp: Utc::now(),
            sql: answer.sql.clone(),
            table: answer.result.as_ref().ok().cloned(),
            chart: answer.chart.clone(),
            success: answer.is_success(),
        });

        if answer.is_success() {
            self.query_count += 1;
        }
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn query_count(&self) -> usize {
        self.query_count
    }
}
