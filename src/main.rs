use anyhow::Result;
use clap::Parser;
use market_mcp::types::DataSource;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Chinese stock market data for Model Context Protocol
///
/// Serves quotes, history and IPO3 company data to MCP clients over stdio.
#[derive(Parser, Debug)]
#[command(name = "market-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file to use instead of the default search locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default quote source
    #[arg(short, long, value_enum)]
    data_source: Option<DataSource>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // stdout carries the protocol
    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        subscriber.with_ansi(false).with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(&args.log_level, args.log_file)?;

    info!("Starting market-mcp v{}", env!("CARGO_PKG_VERSION"));

    let mut loader = market_mcp::ConfigLoader::new().with_data_source(args.data_source);
    if let Some(path) = args.config {
        loader = loader.with_file(path);
    }

    let config = match loader.load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let service = match market_mcp::MarketService::new(Arc::clone(&config)) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            eprintln!("Failed to create market service: {}", e);
            return Err(e.into());
        }
    };

    info!(
        "Market service ready (default source: {})",
        config.data_sources.default
    );

    let mcp_server = market_mcp::McpServer::new(service);

    match mcp_server.run().await {
        Ok(()) => {
            info!("MCP server stopped normally");
        }
        Err(e) => {
            eprintln!("MCP server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
