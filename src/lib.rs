//! Ask natural-language questions about tabular data and get back a
//! validated SQL query, its results, a chart choice and a plain-language
//! insight summary.

pub mod chart;
pub mod config;
pub mod db;
pub mod error;
pub mod generator;
pub mod insight;
pub mod llm;
pub mod pipeline;
pub mod session;
pub mod util;

pub use chart::ChartSpec;
pub use db::result::{ColumnKind, Table, Value};
pub use db::schema::SchemaDescription;
pub use db::source::DataSource;
pub use error::AnalystError;
pub use pipeline::{Analyst, Answer};
pub use session::{ChatSession, ChatTurn};
