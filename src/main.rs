use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

use segment_service::config::ServiceConfig;
use segment_service::history::render_csv;
use segment_service::serve;
use segment_service::SegmentService;

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage user segments, memberships and their audit history")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the segment API over HTTP
    Serve {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Port to listen on (overrides config file)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Print one month of operation history as CSV
    History {
        /// Path to config file (TOML format)
        #[arg(short, long)]
        config: PathBuf,

        /// Year of the export (2023 or later)
        #[arg(short, long)]
        year: i32,

        /// Month of the export (1-12)
        #[arg(short, long)]
        month: u32,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    match args.command {
        Command::Serve { config, port } => run_serve(config, port),
        Command::History {
            config,
            year,
            month,
        } => run_history(config, year, month),
    }
}

fn run_serve(config_path: PathBuf, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_file(&config_path).map_err(|e| e.to_string())?;
    let port = port_override.unwrap_or(config.port);

    info!("Opening database: {}", config.database_path.display());

    // Create tokio runtime and run server
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = SegmentService::open(&config)
            .await
            .map_err(|e| format!("Failed to open service: {}", e))?;
        serve::serve(service, port)
            .await
            .map_err(|e| e.to_string())?;
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

fn run_history(config_path: PathBuf, year: i32, month: u32) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_file(&config_path).map_err(|e| e.to_string())?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = SegmentService::open(&config)
            .await
            .map_err(|e| format!("Failed to open service: {}", e))?;
        let records = service.get_history(year, month).await;
        service.close().await;

        let records = records.map_err(|e| e.detail())?;
        print!("{}", render_csv(&records));
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
