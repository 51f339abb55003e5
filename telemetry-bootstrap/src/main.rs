use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use telemetry_bootstrap::{run, setup_logging, Service};

#[derive(Parser, Debug)]
#[command(name = "telemetry-pipeline")]
#[command(about = "Game telemetry ingestion, storage and analysis services", long_about = None)]
struct Args {
    /// Path to config file (TOML, or YAML by extension)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to <DIR>/<service>.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    service: Service,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_dir = args
        .log_dir
        .or_else(|| std::env::var_os("TELEMETRY_LOG_DIR").map(PathBuf::from));
    let _log_guard = setup_logging(log_dir.as_deref(), args.service.name())?;

    run(args.service, args.config.as_deref()).await
}
