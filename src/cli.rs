//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::agent::StreamMode;
use crate::models::{Category, Currency};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// TradeLens - Pakistan import/export dashboard and analysis chat
///
/// Aggregate monthly trade CSVs into terminal dashboards and reports,
/// and ask the analysis agents about the data.
///
/// Examples:
///   tradelens summary
///   tradelens summary --category food --currency usd
///   tradelens commodities textile --top 10
///   tradelens report --output trade.md
///   tradelens ask "Which commodities drove exports in March?"
///   tradelens chat --api-url http://localhost:8000
///   tradelens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Imports CSV path or http(s) URL
    #[arg(long, global = true, value_name = "PATH", env = "TRADELENS_IMPORTS")]
    pub imports: Option<String>,

    /// Exports CSV path or http(s) URL
    #[arg(long, global = true, value_name = "PATH", env = "TRADELENS_EXPORTS")]
    pub exports: Option<String>,

    /// Analysis API base URL
    #[arg(long, global = true, value_name = "URL", env = "TRADELENS_API_URL")]
    pub api_url: Option<String>,

    /// Analysis request timeout in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Currency values are shown in
    #[arg(long, global = true, value_enum)]
    pub currency: Option<Currency>,

    /// Number of categories or commodities shown before folding into "Others"
    #[arg(long, global = true, value_name = "N")]
    pub top: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tradelens.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .tradelens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Dashboard: key figures, monthly trend and categories
    Summary {
        /// Restrict the dashboard to one category
        #[arg(long, value_enum)]
        category: Option<Category>,
    },

    /// Totals per category, largest first
    Categories,

    /// Commodities traded within a category
    Commodities {
        #[arg(value_enum)]
        category: Category,
    },

    /// Monthly totals, optionally for one category
    Months {
        #[arg(long, value_enum)]
        category: Option<Category>,
    },

    /// Export the dashboard as Markdown or JSON
    Report {
        /// Output file path for the report
        #[arg(short, long, default_value = "tradelens_report.md", value_name = "FILE")]
        output: PathBuf,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        #[arg(long, value_enum)]
        category: Option<Category>,
    },

    /// Check whether the analysis API is reachable
    Health,

    /// Ask the analysis agents a single question
    Ask {
        /// The question
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Interactive chat with the analysis agents
    Chat {
        /// Reveal answers word-wise or sentence-wise
        #[arg(long, value_enum)]
        mode: Option<StreamMode>,

        /// Minimum characters per revealed chunk
        #[arg(long, value_name = "CHARS")]
        chunk_size: Option<usize>,

        /// Delay between chunks in milliseconds
        #[arg(long, value_name = "MS")]
        delay_ms: Option<u64>,
    },
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.command.is_none() {
            return Err("No command given. Run with --help to see the commands.".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if self.top == Some(0) {
            return Err("Top must be at least 1".to_string());
        }

        if let Some(Command::Chat {
            chunk_size: Some(0),
            ..
        }) = self.command
        {
            return Err("Chunk size must be at least 1".to_string());
        }

        if let Some(Command::Ask { ref query }) = self.command {
            if query.iter().all(|q| q.trim().is_empty()) {
                return Err("Question must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
