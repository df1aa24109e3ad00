//! rustplate - an example app reading configs
//!
//! Usage:
//!     rustplate [--config <path>] [-i <dir>] [-o <dir>]
//!
//! See --help for more options.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use rustplate::config::{ConfigLoader, ConfigResolver, DEFAULT_METRICS_PATH, keys};
use rustplate::metrics::{MetricsCollector, MetricsServer};
use rustplate::util::{LogMode, init_logging};

/// An example app reading configs.
#[derive(Parser, Debug)]
#[command(name = "rustplate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default is configs/configs.{json,toml,yaml,yml})
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short = 'o', long = "outputDir", value_name = "DIR")]
    output_dir: Option<String>,

    /// Input directory
    #[arg(short = 'i', long = "inputDir", value_name = "DIR")]
    input_dir: Option<String>,

    /// Serve metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, value_name = "ADDR")]
    metrics_address: Option<String>,

    /// HTTP path of the metrics endpoint
    #[arg(long, value_name = "PATH")]
    metrics_path: Option<String>,

    /// Prefix for environment variable names
    #[arg(long, value_name = "PREFIX")]
    env_prefix: Option<String>,

    /// Log JSON at info level instead of colorized debug output
    #[arg(long)]
    production: bool,

    /// Exit with an error if the config file cannot be loaded
    #[arg(long)]
    strict: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // No logger, no process
    init_logging(LogMode::from_production(cli.production))
        .context("failed to initialize logging")?;

    let config_file = cli.config.clone().filter(|p| !p.as_os_str().is_empty());
    let loader = ConfigLoader::new()
        .config_file(config_file)
        .env_prefix(cli.env_prefix.clone())
        .default_value(keys::METRICS_PATH, DEFAULT_METRICS_PATH)
        .flag(keys::INPUT_DIR, cli.input_dir.clone())
        .flag(keys::OUTPUT_DIR, cli.output_dir.clone())
        .flag(keys::METRICS_ADDRESS, cli.metrics_address.clone())
        .flag(keys::METRICS_PATH, cli.metrics_path.clone());

    let resolver = if cli.strict {
        loader
            .load_strict()
            .context("failed to load configuration")?
    } else {
        loader.load()
    };

    if cli.print_config {
        let resolved = resolver.resolved();
        print!(
            "{}",
            serde_yaml::to_string(&resolved).context("failed to render configuration")?
        );
        return Ok(());
    }

    for value in resolver.resolved() {
        debug!(
            key = %value.key,
            value = %value.value,
            source = %value.source,
            "resolved configuration value"
        );
    }

    report_directories(&resolver);

    let address = resolver.get(keys::METRICS_ADDRESS);
    if address.is_empty() {
        return Ok(());
    }

    let address: SocketAddr = address
        .parse()
        .with_context(|| format!("invalid metrics address '{address}'"))?;

    run(address, resolver.get(keys::METRICS_PATH))
}

fn report_directories(resolver: &ConfigResolver) {
    let input = resolver.resolve(keys::INPUT_DIR);
    let output = resolver.resolve(keys::OUTPUT_DIR);

    debug!(path = %input.value, source = %input.source, "input directory");
    debug!(path = %output.value, source = %output.source, "output directory");

    let dirs = resolver.directories();
    if dirs.input_dir.is_none() {
        warn!("no input directory configured");
    }
    if dirs.output_dir.is_none() {
        warn!("no output directory configured");
    }
}

/// Serve metrics until Ctrl+C.
fn run(address: SocketAddr, path: String) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async { run_async(address, path).await })
}

async fn run_async(address: SocketAddr, path: String) -> Result<()> {
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let collector = MetricsCollector::new();
    let server = MetricsServer::bind(address, path, collector)
        .await
        .with_context(|| format!("failed to bind metrics server on {address}"))?;

    let handle = tokio::spawn(server.run(shutdown_tx.subscribe()));

    info!("press Ctrl+C to stop");

    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            info!("received shutdown signal");
        }
        Err(e) => {
            error!(error = %e, "failed to listen for shutdown signal");
        }
    }

    let _ = shutdown_tx.send(());
    let _ = handle.await;

    info!("shut down complete");
    Ok(())
}
