//! Accessibility scan demonstration.
//!
//! Demonstrates:
//! - Waiting for the remote end on a local WebSocket port
//! - Scanning a page and all of its frames
//! - Printing a readable violations report
//! - Writing the JSON results to a file
//!
//! Usage:
//!   cargo run --example scan_page -- <engine.js> [url]
//!   cargo run --example scan_page -- <engine.js> [url] --legacy
//!   cargo run --example scan_page -- <engine.js> [url] --debug

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr};

use anyhow::Context;
use axe_webdriver::{EngineSource, Page, ResultType, ScanBuilder, readable_report};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "https://example.com";
const PORT: u16 = 9515;
const OUTPUT_FILE: &str = "scan-results.json";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    engine: String,
    url: String,
    debug: bool,
    legacy: bool,
}

impl Args {
    fn parse() -> Option<Self> {
        let args: Vec<String> = std::env::args().skip(1).collect();
        let mut positional = args.iter().filter(|a| !a.starts_with("--"));

        Some(Self {
            engine: positional.next()?.clone(),
            url: positional
                .next()
                .cloned()
                .unwrap_or_else(|| DEFAULT_URL.to_string()),
            debug: args.iter().any(|a| a == "--debug"),
            legacy: args.iter().any(|a| a == "--legacy"),
        })
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let Some(args) = Args::parse() else {
        eprintln!("usage: scan_page <engine.js> [url] [--legacy] [--debug]");
        std::process::exit(2);
    };
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Accessibility Scan ===\n");

    println!("[Setup] Waiting for remote end on port {PORT}...");
    let page = Page::connect(IpAddr::V4(Ipv4Addr::LOCALHOST), PORT)
        .await
        .context("remote end did not connect")?;
    println!("        ✓ Connected (session={})\n", page.session_id());

    println!("[Setup] Navigating to {}...", args.url);
    page.navigate(&args.url).await?;
    println!("        ✓ Navigated\n");

    println!("[Scan] Running engine from {}...", args.engine);
    let results = ScanBuilder::new()
        .source(EngineSource::file(&args.engine))
        .legacy_mode(args.legacy)
        .output_file(OUTPUT_FILE)
        .analyze(&page)
        .await
        .context("scan failed")?;
    println!(
        "        ✓ {} violations, {} incomplete\n",
        results.violations.len(),
        results.incomplete.len()
    );

    if let Some(message) = &results.error_message {
        println!("[Engine] Reported an error: {message}\n");
    }

    match readable_report(ResultType::Violations, &results.url, &results.violations) {
        Some(report) => println!("{report}\n"),
        None => println!("No violations found.\n"),
    }

    println!("Results written to {OUTPUT_FILE}");
    page.shutdown();
    Ok(())
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "axe_webdriver=debug"
    } else {
        "axe_webdriver=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}
