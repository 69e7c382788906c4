//! TradeLens - Pakistan import/export trade dashboard
//!
//! A CLI tool that aggregates monthly import and export CSVs into
//! terminal dashboards and reports, and chats with a remote pair of
//! analysis agents about the data.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad data, unreachable API, config, etc.)

mod agent;
mod analysis;
mod cli;
mod config;
mod data;
mod error;
mod models;
mod report;
#[cfg(test)]
mod test_support;

use agent::{
    spawn_stream, AnalysisBackend, AnalysisClient, BackendStatus, ChatSession, SendOutcome,
    StreamEvent, StreamOptions,
};
use agent::session::{ChatMessage, RevealSegment};
use analysis::{
    category_aggregates, commodities_by_category, data_by_category, grand_totals,
    monthly_aggregates, DashboardView,
};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use cli::{Args, Command, OutputFormat};
use config::{Config, StreamConfig, CONFIG_FILE};
use data::{DataSource, TradeDataset, TradeStore};
use indicatif::{ProgressBar, ProgressStyle};
use models::{Category, Currency};
use report::{DashboardReport, ReportMetadata};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("TradeLens v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Command failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .tradelens.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the CSV locations, API URL and display options.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` overrides the verbosity flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(args.log_level()).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the selected command.
async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let Some(command) = args.command.clone() else {
        bail!("No command given");
    };
    let currency = config.display.currency;
    let top_n = config.display.top_n;

    match command {
        Command::Summary { category } => {
            let store = load_dataset(&config, args.quiet).await?;
            let view = DashboardView::build(&store, currency, category, top_n);
            println!("{}", report::render_dashboard(&view));
        }
        Command::Categories => {
            let store = load_dataset(&config, args.quiet).await?;
            let totals = grand_totals(&store);

            println!("🗂️  Categories ({})\n", currency);
            println!(
                "{}",
                report::render_category_table(&category_aggregates(&store), currency)
            );
            let grand = match currency {
                Currency::Pkr => totals.total(),
                Currency::Usd => totals.total_usd(),
            };
            println!("   Grand total: {}", report::format_value(grand, currency));
        }
        Command::Commodities { category } => {
            let store = load_dataset(&config, args.quiet).await?;
            print_commodities(&store, category, currency, top_n);
        }
        Command::Months { category } => {
            let store = load_dataset(&config, args.quiet).await?;
            let months = match category {
                Some(c) => data_by_category(&store, c),
                None => monthly_aggregates(&store),
            };

            if months.is_empty() {
                println!("No monthly data for {}.", describe(category));
            } else {
                println!("📅 Monthly totals: {} ({})\n", describe(category), currency);
                println!("{}", report::render_month_table(&months, currency));
            }
        }
        Command::Report {
            output,
            format,
            category,
        } => {
            let store = load_dataset(&config, args.quiet).await?;
            let report = DashboardReport {
                metadata: ReportMetadata {
                    imports_source: config.data.imports_path.clone(),
                    exports_source: config.data.exports_path.clone(),
                    generated_at: Utc::now(),
                    rows_loaded: store.rows().len(),
                    months: store.months().to_vec(),
                },
                view: DashboardView::build(&store, currency, category, top_n),
            };

            println!("📝 Generating report...");
            let content = match format {
                OutputFormat::Json => report::generate_json_report(&report)?,
                OutputFormat::Markdown => report::generate_markdown_report(&report),
            };
            std::fs::write(&output, &content)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;

            println!("✅ Report saved to: {}", output.display());
        }
        Command::Health => {
            let client = AnalysisClient::new(config.api.client_config())?;
            if client.health_check().await {
                println!("🟢 Analysis API is up at {}", client.base_url());
            } else {
                bail!("Analysis API is not reachable at {}", client.base_url());
            }
        }
        Command::Ask { query } => {
            let client = AnalysisClient::new(config.api.client_config())?;
            let base_url = client.base_url().to_string();
            let mut session = ChatSession::new(client);

            if session.check_backend().await != BackendStatus::Connected {
                bail!("Analysis API is not reachable at {}", base_url);
            }
            ask_agents(&mut session, &query.join(" "), &config.stream, args.quiet).await?;
        }
        Command::Chat { .. } => {
            run_chat(&config, args.quiet).await?;
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

fn spinner(message: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load both CSVs into the process-wide dataset.
async fn load_dataset(config: &Config, quiet: bool) -> Result<Arc<TradeStore>> {
    let imports = DataSource::parse(&config.data.imports_path);
    let exports = DataSource::parse(&config.data.exports_path);
    let dataset = TradeDataset::global();
    if dataset.is_initialized() {
        return Ok(dataset.store()?);
    }

    let pb = spinner("Loading trade data...", quiet);
    let result = dataset.init(&imports, &exports).await;
    pb.finish_and_clear();

    let summary = result?;
    if !quiet {
        println!(
            "📥 Loaded {} categories over {} months\n",
            summary.groups.len(),
            summary.months.len()
        );
    }

    Ok(dataset.store()?)
}

fn describe(category: Option<Category>) -> String {
    category
        .map(|c| c.to_string())
        .unwrap_or_else(|| "all categories".to_string())
}

fn print_commodities(store: &TradeStore, category: Category, currency: Currency, top_n: usize) {
    let commodities = commodities_by_category(store, category);

    if commodities.is_empty() {
        println!("No commodities recorded for {}.", category);
        return;
    }

    let shown = top_n.min(commodities.len());
    println!("📦 {} commodities ({})\n", category, currency);
    println!(
        "{}",
        report::render_commodity_table(&commodities[..shown], currency)
    );
    if commodities.len() > shown {
        println!("   ... and {} more", commodities.len() - shown);
    }
}

/// Send a query and reveal both answers. Failures become errors and Ctrl-C
/// abandons the request.
async fn ask_agents<B: AnalysisBackend>(
    session: &mut ChatSession<B>,
    query: &str,
    stream: &StreamConfig,
    quiet: bool,
) -> Result<()> {
    let pb = spinner("Agents are analyzing...", quiet);
    let outcome = tokio::select! {
        outcome = session.send(query) => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };
    pb.finish_and_clear();

    let Some(outcome) = outcome else {
        session.cancel_streaming();
        println!("\n⏹️  Request cancelled.");
        return Ok(());
    };

    match outcome {
        SendOutcome::Ignored => Ok(()),
        SendOutcome::Rejected => Err(anyhow!(session
            .error()
            .unwrap_or("Backend is not connected.")
            .to_string())),
        SendOutcome::Failed(message) => {
            if let Some(last) = session.messages().last() {
                print_message(last);
            }
            Err(anyhow!(message))
        }
        SendOutcome::Reply(segments) => {
            let options = stream.options();
            for (i, segment) in segments.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(stream.agent_pause()).await;
                }
                if !reveal(session, segment, &options).await {
                    session.cancel_streaming();
                    println!("\n⏹️  Reveal stopped.");
                    break;
                }
            }
            Ok(())
        }
    }
}

/// Reveal one answer chunk by chunk. Returns false when cancelled by Ctrl-C.
async fn reveal<B: AnalysisBackend>(
    session: &mut ChatSession<B>,
    segment: &RevealSegment,
    options: &StreamOptions,
) -> bool {
    let (handle, mut events) = spawn_stream(&segment.text, options);
    let mut stdout = std::io::stdout();

    print!(
        "\n{} {}: ",
        segment.sender.avatar(),
        segment.sender.display_name()
    );
    let _ = stdout.flush();

    let completed = loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(StreamEvent::Chunk(chunk)) => {
                    print!("{}", chunk);
                    let _ = stdout.flush();
                    session.append_chunk(segment.message_id, &chunk);
                }
                Some(StreamEvent::Done) => break true,
                None => break false,
            },
            _ = tokio::signal::ctrl_c() => {
                handle.cancel();
                break false;
            }
        }
    };

    println!();
    session.finish_streaming(segment.message_id);
    completed
}

fn print_message(message: &ChatMessage) {
    let marker = if message.is_error { " ⚠️" } else { "" };
    println!(
        "\n{} {}{}: {}",
        message.sender.avatar(),
        message.sender.display_name(),
        marker,
        message.text
    );
}

fn print_status(status: BackendStatus, base_url: &str) {
    match status {
        BackendStatus::Connected => println!("🟢 Connected to {}", base_url),
        BackendStatus::Disconnected => {
            println!("🔴 Analysis API is not reachable at {}", base_url)
        }
        BackendStatus::Checking => println!("🟡 Checking {}...", base_url),
    }
}

/// Interactive chat loop.
async fn run_chat(config: &Config, quiet: bool) -> Result<()> {
    let client = AnalysisClient::new(config.api.client_config())?;
    let base_url = client.base_url().to_string();
    let mut session = ChatSession::new(client);

    println!("💬 TradeLens chat. Commands: /new /insights /health /chart <file> /history /quit");
    print_status(session.check_backend().await, &base_url);
    for message in session.messages() {
        print_message(message);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\n> ");
        let _ = std::io::stdout().flush();

        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read input")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        let input = line.trim();
        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));

        match command {
            "" => continue,
            "/quit" | "/exit" => break,
            "/new" => {
                session.reset();
                println!("🆕 New session {}", session.id());
                for message in session.messages() {
                    print_message(message);
                }
            }
            "/health" => print_status(session.check_backend().await, &base_url),
            "/insights" => {
                let mut any = false;
                for insight in session.insights() {
                    any = true;
                    println!(
                        "   [{}] {} {}",
                        insight.timestamp.format("%H:%M:%S"),
                        insight.kind,
                        insight.text
                    );
                }
                if !any {
                    println!("   No planning insights yet.");
                }
            }
            "/history" => {
                for message in session.messages() {
                    print_message(message);
                }
            }
            "/chart" => {
                let path = rest.trim();
                if path.is_empty() {
                    println!("   Usage: /chart <file>");
                    continue;
                }
                match session.latest_chart() {
                    Some(chart) => {
                        let json = serde_json::to_string_pretty(chart)?;
                        match std::fs::write(path, json) {
                            Ok(()) => println!("✅ Chart data saved to: {}", path),
                            Err(e) => println!("❌ Failed to write {}: {}", path, e),
                        }
                    }
                    None => println!("   No chart data yet."),
                }
            }
            c if c.starts_with('/') => println!("   Unknown command: {}", c),
            _ => {
                if let Err(e) = ask_agents(&mut session, input, &config.stream, quiet).await {
                    println!("\n❌ {}", e);
                    if session.status() != BackendStatus::Connected {
                        println!("   Use /health to check the connection again.");
                    }
                }
            }
        }
    }

    println!(
        "👋 Session {} ended after {}",
        session.id(),
        session.duration()
    );
    Ok(())
}
