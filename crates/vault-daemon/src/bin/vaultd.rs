#![deny(unsafe_code)]

use std::process::ExitCode;

use clap::Parser;
use vault_daemon::cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_filter = vault_daemon::cli::log_level(&args).to_string();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    vault_daemon::run(&args)
}
