//! Minimal log collector for the remote sink.
//!
//! Accepts `POST /` with any JSON body and appends it as one line to the
//! output file.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: 0.0.0.0:8080, data.json
//! cargo run --bin receiver
//!
//! # Custom address and file
//! cargo run --bin receiver -- --listen 127.0.0.1:9000 --output /tmp/logs.jsonl
//! ```
//!
//! # Environment Variables
//!
//! - `RECEIVER_LISTEN`: bind address
//! - `RECEIVER_OUTPUT`: output file
//! - `RUST_LOG`, `LOG_FORMAT`: local logging

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use trace_logger::{logging, server};

/// Collector for request logs shipped by the remote sink.
#[derive(Parser)]
#[command(name = "receiver")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "RECEIVER_LISTEN", default_value = "0.0.0.0:8080")]
    listen: String,

    /// File receiving one JSON document per line
    #[arg(long, env = "RECEIVER_OUTPUT", default_value = "data.json")]
    output: PathBuf,

    /// Local log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Local log format: text or json
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    log_format: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    logging::init_tracing(&cli.log_level, &cli.log_format)?;

    server::run_receiver(&cli.listen, &cli.output).await
}
