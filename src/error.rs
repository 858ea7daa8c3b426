use std::error::Error;
use std::fmt;

use crate::llm::LlmError;

/// Typed failure surfaced by the pipeline. Component-local failures are
/// converted into one of these variants; no raw error ever crosses the
/// library boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalystError {
    /// No language-model credential is configured.
    Configuration(String),
    /// The query violates the read-only policy. Never retried.
    Forbidden(String),
    /// Model output failed validation.
    GenerationInvalid(String),
    /// The data source rejected the query at execution time.
    Execution(String),
    /// Connection-level failure. Fatal for the request.
    DataSource(String),
}

impl fmt::Display for AnalystError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalystError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            AnalystError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AnalystError::GenerationInvalid(msg) => write!(f, "Invalid generated query: {}", msg),
            AnalystError::Execution(msg) => write!(f, "SQL error: {}", msg),
            AnalystError::DataSource(msg) => write!(f, "Data source error: {}", msg),
        }
    }
}

impl Error for AnalystError {}

impl From<LlmError> for AnalystError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::ConfigError(msg) => AnalystError::Configuration(msg),
            other => AnalystError::GenerationInvalid(other.to_string()),
        }
    }
}
