//! variant-edge: A/B test variant selection at the edge.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request ──▶ http::server (request id, timeout, concurrency limit)
//!                              │
//!                              ▼
//!                      experiment::variants ──────▶ variants endpoint (JSON)
//!                              │
//!                              ▼
//!                      experiment::cookie + selection
//!                              │
//!                              ▼
//!                      variant page fetch ────────▶ variant page (HTML)
//!                              │
//!                              ▼
//!                      rewrite::page (streaming, four selectors)
//!                              │
//!                              ▼
//!     Client Response ◀── http::response (mirror head, Set-Cookie if new)
//! ```

use std::path::PathBuf;

use clap::Parser;
use variant_edge::lifecycle::startup::{self, StartupOptions};

#[derive(Parser)]
#[command(name = "variant-edge")]
#[command(about = "A/B variant selection and page rewriting edge handler", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reload the experiment when the configuration file changes
    #[arg(short, long, requires = "config")]
    watch: bool,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    startup::run(StartupOptions {
        config_path: cli.config,
        watch: cli.watch,
        bind_address: cli.bind,
    })
    .await
}
