use clap::Parser;
use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no api_key is present in the file.
pub const API_KEY_ENV: &str = "LLM_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    pub backend: String, // "remote", "ollama", or "none"
    pub model: String,
    pub api_key: Option<String>,
    pub api_url: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Path to the DuckDB database file
    #[arg(short, long)]
    pub database: Option<String>,

    /// Answer a single question and exit instead of reading stdin
    #[arg(short, long)]
    pub question: Option<String>,
}

impl AppConfig {
    pub fn new(args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config_builder = Config::builder();
        let mut found_file = false;

        if let Some(config_path) = &args.config {
            config_builder = config_builder.add_source(File::from(config_path.as_path()));
            found_file = true;
        } else {
            let default_locations = vec![
                "config.toml",
                "config/config.toml",
                "/etc/askdb/config.toml",
            ];

            for location in default_locations {
                if Path::new(location).exists() {
                    config_builder =
                        config_builder.add_source(File::new(location, config::FileFormat::Toml));
                    found_file = true;
                    break;
                }
            }
        }

        let mut config: AppConfig = if found_file {
            config_builder.build()?.try_deserialize()?
        } else {
            AppConfig::default()
        };

        // Override with command line args if provided
        if let Some(database) = &args.database {
            config.database.path = database.clone();
        }

        // A credential from the environment fills a missing api_key.
        if config.llm.api_key.is_none() {
            if let Ok(key) = std::env::var(API_KEY_ENV) {
                if !key.is_empty() {
                    config.llm.api_key = Some(key);
                }
            }
        }

        Ok(config)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "askdb.duckdb".to_string(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: "remote".to_string(),
            model: "gpt-4".to_string(),
            api_key: None,
            api_url: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            llm: LlmConfig::default(),
        }
    }
}
