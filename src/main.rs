use clap::Parser;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

use askdb::chart;
use askdb::config::{AppConfig, CliArgs};
use askdb::db::result::Table;
use askdb::db::source::DataSource;
use askdb::llm::LlmManager;
use askdb::pipeline::{Analyst, Answer};
use askdb::session::ChatSession;
use askdb::util::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_tracing();

    // Parse command line arguments
    let args = CliArgs::parse();

    // Load configuration
    let config = match AppConfig::new(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Opening database: {}", config.database.path);
    let source = DataSource::open(&config.database.path)?;

    let llm = match LlmManager::from_config(&config.llm) {
        Ok(llm) => llm,
        Err(e) => {
            error!("Failed to initialize LLM backend: {}", e);
            return Err(e.into());
        }
    };
    if llm.is_none() {
        info!("No language model configured; using statistical insights only");
    }

    let analyst = Analyst::new(source, llm);
    let mut session = ChatSession::new();

    if let Some(question) = &args.question {
        answer_one(&analyst, &mut session, question).await;
        return Ok(());
    }

    // Interactive mode: one question per line.
    println!("Ask a question about your data (empty line or 'exit' to quit).");
    print!("> ");
    io::stdout().flush()?;
    for line in io::stdin().lock().lines() {
        let line = line?;
        let question = line.trim();
        if question.is_empty() || question == "exit" || question == "quit" {
            break;
        }
        answer_one(&analyst, &mut session, question).await;
        print!("> ");
        io::stdout().flush()?;
    }

    info!("Processed {} queries this session", session.query_count());
    Ok(())
}

async fn answer_one(analyst: &Analyst, session: &mut ChatSession, question: &str) {
    session.push_user(question);
    let answer = analyst.ask(question).await;
    print_answer(&answer);
    session.push_answer(&answer);
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.message());

    if let Some(sql) = &answer.sql {
        println!("\nSQL: {}", sql);
    }

    match &answer.result {
        Ok(table) if !table.is_empty() => {
            println!("\n{}", render_table(table));
            if let Some(spec) = &answer.chart {
                println!("Chart: {}", chart::chart_summary(spec, table));
            }
        }
        _ => {}
    }

    if let Some(explanation) = &answer.explanation {
        println!("\nWhat this query does: {}", explanation);
    }
    if !answer.insight.is_empty() {
        println!("\nInsights:\n{}", answer.insight);
    }
    if !answer.followups.is_empty() {
        println!("\nSuggested follow-up questions:");
        for suggestion in &answer.followups {
            println!("  - {}", suggestion);
        }
    }
    println!();
}

fn render_table(table: &Table) -> String {
    let mut lines = vec![table.columns().join(" | ")];
    lines.push(
        table
            .columns()
            .iter()
            .map(|c| "-".repeat(c.len()))
            .collect::<Vec<_>>()
            .join("-|-"),
    );
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        lines.push(cells.join(" | "));
    }
    lines.push(format!("({} rows)", table.row_count()));
    lines.join("\n")
}
