//! gourmet-mcp-server: MCP server for gourmet search around Chigasaki
//!
//! Exposes the `search_places` tool over stdio. Spawned by `gourmet-agent`
//! (or any MCP client) as a subprocess; one client per process lifetime.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use chigasaki_gourmet_mcp::config;
use chigasaki_gourmet_mcp::mcp::registry::ToolRegistry;
use chigasaki_gourmet_mcp::mcp::server::McpServer;
use chigasaki_gourmet_mcp::mcp::transport::StdioTransport;
use chigasaki_gourmet_mcp::places::{GooglePlacesClient, PlacesSearchTool};

/// MCP server for gourmet search around Chigasaki.
///
/// Wraps the Google Places API (New) text search behind a single
/// `search_places` tool, filtered to places rated 4.0 and above by default.
#[derive(Parser, Debug)]
#[command(name = "gourmet-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
///
/// Logging goes to stderr: stdout carries protocol messages only.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the gourmet-mcp-server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load .env (if present) before reading any environment variable
    config::load_dotenv();

    // Load configuration
    let cfg = match config::load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        locality = %cfg.search.locality,
        "Starting gourmet-mcp-server"
    );

    // Bind the credential once, at construction. A missing key is not
    // fatal here: the tool list must stay retrievable, and the first
    // invocation reports the problem as a search error.
    let api_key = config::api_key_from_env();
    if api_key.is_none() {
        info!(
            "{} not set; searches will report a configuration error",
            config::API_KEY_VAR
        );
    }

    let api = Arc::new(GooglePlacesClient::new(&cfg.search));
    let tool = PlacesSearchTool::new(cfg.search, api_key, api);
    let mut server = McpServer::new(ToolRegistry::new(tool));

    info!("MCP server ready, waiting for client connection...");

    // Run the server
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let mut transport = StdioTransport::new();
    let result = runtime.block_on(server.run(&mut transport));

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
