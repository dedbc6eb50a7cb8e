mod cli;
mod commands;
mod formatting;
mod settings;

use std::process::ExitCode;

use cli::Commands;
use commands::{run_capture, run_inspect};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `a11ysnap_lib=trace`).
const LOG_ENV: &str = "A11YSNAP_LOG";

#[tokio::main]
async fn main() -> ExitCode {
    run().await
}

async fn run() -> ExitCode {
    let raw_args: Vec<String> = std::env::args().collect();
    let args = cli::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Capture(capture) => {
            run_capture(&raw_args, args.config, args.verbose, capture).await
        }
        Commands::Inspect {
            snapshot,
            format,
            output,
        } => run_inspect(snapshot, format, output),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
