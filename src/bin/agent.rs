//! gourmet-agent: gourmet search client for the Chigasaki area
//!
//! Spawns `gourmet-mcp-server` as a subprocess, performs the MCP
//! handshake, invokes the `search_places` tool once, and renders the
//! outcome for a human reader.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use serde_json::json;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use chigasaki_gourmet_mcp::config;
use chigasaki_gourmet_mcp::error::SessionError;
use chigasaki_gourmet_mcp::mcp::client::McpClient;
use chigasaki_gourmet_mcp::mcp::protocol::ToolContent;
use chigasaki_gourmet_mcp::places::{PlaceRecord, SearchOutcome};

/// Category tags worth showing to a diner.
const FOOD_TYPES: [&str; 5] = ["restaurant", "food", "meal_takeaway", "cafe", "bakery"];

/// Gourmet search agent for the Chigasaki area.
///
/// Spawns the MCP server, searches for places matching the query, and
/// prints every result rated at or above the minimum rating.
#[derive(Parser, Debug)]
#[command(name = "gourmet-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Area name to display (e.g. 茅ヶ崎市, 藤沢市, 平塚市, 寒川町)
    #[arg(value_name = "LOCATION", default_value = "茅ヶ崎市")]
    location: String,

    /// Search query (e.g. ランチ, ディナー, カフェ)
    #[arg(short, long, default_value = "ランチ")]
    query: String,

    /// Minimum rating
    #[arg(short = 'r', long, default_value_t = 4.0)]
    min_rating: f64,

    /// Path to the server binary (default: gourmet-mcp-server next to this executable)
    #[arg(long, value_name = "SERVER_BIN")]
    server: Option<PathBuf>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Resolves the server binary path: an explicit flag wins, otherwise the
/// sibling `gourmet-mcp-server` of the current executable.
fn server_path(args: &Args) -> Result<PathBuf, SessionError> {
    if let Some(path) = &args.server {
        return Ok(path.clone());
    }

    let current = std::env::current_exe().map_err(SessionError::Transport)?;
    let dir = current
        .parent()
        .ok_or_else(|| SessionError::Spawn("cannot locate executable directory".to_string()))?;
    Ok(dir.join(format!("gourmet-mcp-server{}", std::env::consts::EXE_SUFFIX)))
}

/// Runs one search session against a freshly spawned server.
async fn run(args: &Args) -> Result<(), SessionError> {
    let server = server_path(args)?;
    let mut client = McpClient::spawn(&server, &[])?;

    // Protocol handshake; any failure here is unrecoverable
    client.initialize().await?;

    println!("{}", "=".repeat(60));
    println!("Gourmet Search Agent");
    println!("{}", "=".repeat(60));
    println!();
    println!("Location:   {}", args.location);
    println!("Query:      {}", args.query);
    println!("Min rating: {}+", args.min_rating);
    println!();

    // The server's schema ignores the extra location key; it is carried
    // for display parity and forward compatibility.
    let result = client
        .call_tool(
            "search_places",
            json!({
                "location": args.location,
                "query": args.query,
                "min_rating": args.min_rating,
            }),
        )
        .await?;

    let Some(first) = result.content.first() else {
        client.shutdown().await;
        return Err(SessionError::UnexpectedShape(
            "server returned no content".to_string(),
        ));
    };
    let ToolContent::Text { text } = first else {
        client.shutdown().await;
        return Err(SessionError::UnexpectedShape(
            "expected a text content item".to_string(),
        ));
    };

    if result.is_error {
        // Dispatch-level failure (bad tool name or arguments); reported,
        // not fatal
        println!("Search failed: {text}");
        client.shutdown().await;
        return Ok(());
    }

    let outcome: SearchOutcome = serde_json::from_str(text).map_err(|e| {
        SessionError::UnexpectedShape(format!("tool returned non-JSON text: {e}"))
    })?;

    match outcome {
        SearchOutcome::Error { error } => {
            println!("Search error: {error}");
        }
        SearchOutcome::Success { count, places, .. } => {
            render_places(&args.location, count, &places);
        }
    }

    client.shutdown().await;
    Ok(())
}

/// Renders the qualifying places, one block each.
fn render_places(location: &str, count: usize, places: &[PlaceRecord]) {
    println!("Search complete: {count} spot(s) found around {location}");
    println!();
    println!("{}", "-".repeat(60));

    if places.is_empty() {
        println!("No spots matched the given conditions.");
        println!("Try a different query or a lower minimum rating.");
    } else {
        for (idx, place) in places.iter().enumerate() {
            println!();
            println!("{}. {}", idx + 1, place.name);
            println!(
                "   Rating:  {:.1} ({} reviews)",
                place.rating, place.user_ratings_total
            );
            println!("   Address: {}", place.address);

            let categories: Vec<&str> = place
                .types
                .iter()
                .map(String::as_str)
                .filter(|t| FOOD_TYPES.contains(t))
                .collect();
            if !categories.is_empty() {
                println!("   Category: {}", categories.join(", "));
            }
        }
        println!();
    }

    println!("{}", "-".repeat(60));
    println!();
    println!("Tip: look the spot up on Google Maps for opening hours and menus.");
}

/// Entry point for the gourmet-agent client.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load .env before spawning so the server inherits MAPS_API_KEY
    config::load_dotenv();
    init_tracing(args.verbose);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to create Tokio runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!();
            eprintln!("Troubleshooting:");
            eprintln!("1. Check that MAPS_API_KEY is set in the environment or a .env file");
            eprintln!("2. Check that gourmet-mcp-server starts on its own");
            eprintln!("3. Check your network connection");
            ExitCode::FAILURE
        }
    }
}
