use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use corvid::config;
use corvid::engine::Engine;
use corvid::uci;

#[derive(Parser, Debug)]
#[command(name = "corvid", about = "A UCI chess engine")]
struct Cli {
    /// Path to a YAML config file overriding the compiled-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for the tracing subscriber (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let engine_config = match config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(err) => {
            error!(%err, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    info!(?engine_config, "corvid starting");

    let engine = Engine::new(engine_config);
    uci::run(engine);

    ExitCode::SUCCESS
}
