mod args;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};
use tsuzuki_core::config::AppConfig;

use args::{Cli, Command};

fn init_tracing(verbose: bool) -> WorkerGuard {
    let default = if verbose { "tsuzuki=debug" } else { "tsuzuki=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let file_appender = tracing_appender::rolling::daily(AppConfig::log_dir(), "tsuzuki.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let _guard = init_tracing(cli.verbose);

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "failed to load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Run => commands::run(config).await,
        Command::Check => commands::check(config).await,
        Command::List => commands::list().await,
        Command::Edit(args) => commands::edit(args).await,
        Command::Forget { media_id } => commands::forget(media_id).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tsuzuki failed");
            ExitCode::FAILURE
        }
    }
}
