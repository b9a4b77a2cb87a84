use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::Parser;
use murmur_core::config::Config;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const DEBUG_LOG: &str = "/tmp/murmur-debug.log";

#[derive(Parser)]
#[command(name = "murmur", about = "Murmur, an anonymous feedback intake API")]
struct Cli {
    /// TOML file layered between the built-in defaults and the environment.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listening port (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Path of the JSON document holding feedback and settings (overrides DATA_PATH).
    #[arg(long)]
    data: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise, and append the
    /// log to /tmp/murmur-debug.log as well (tail -f to inspect).
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    let debug_file = if cli.debug {
        let file = murmur::open_debug_log(Path::new(DEBUG_LOG))?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(debug_file)
        .init();
    if cli.debug {
        tracing::info!("murmur debug log started, tail -f {DEBUG_LOG}");
    }

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    murmur::serve(config).await
}
