//! Procgate RPC Server - JSON-RPC front end for process inspection and control.
//!
//! This binary provides a JSON-RPC 2.0 server that wraps the procgate-core
//! library so a remote tool caller can list, inspect and terminate processes.

mod handlers;
mod server;

use anyhow::Result;
use clap::Parser;
use procgate_core::{AccessPolicyConfig, ProcgateApi, ServiceConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "procgate-rpc")]
#[command(about = "JSON-RPC server for owner-scoped process inspection and control")]
struct Args {
    /// Port to listen on (0 = auto-assign)
    #[arg(short, long, default_value = "0")]
    port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Permit operations on superuser-owned processes (same as ALLOW_ROOT=Y)
    #[arg(long)]
    allow_root: bool,
}

fn init_logging(args: &Args) {
    let default_level = if args.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // stdout is reserved for the RPC_PORT line.
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    if args.json_logs {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    info!("Starting {} RPC server", ServiceConfig::SERVICE_NAME);

    let policy = if args.allow_root {
        AccessPolicyConfig::new(true)
    } else {
        AccessPolicyConfig::from_env()
    };
    if policy.allow_root_access {
        warn!("Operations on superuser-owned processes are enabled");
    }

    let api = ProcgateApi::builder().policy(policy).build();

    // Start the server
    let addr = server::start_server(api, &args.host, args.port).await?;

    // Print port for the parent process to read (intentional stdout for IPC)
    println!("RPC_PORT={}", addr.port());

    info!("RPC server running on {}", addr);

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, exiting");

    Ok(())
}
