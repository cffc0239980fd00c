mod cli;
mod commands;
mod config;
mod error;
mod output;

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use trmnly_core::Controller;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands don't need a server connection
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "trmnly", &mut std::io::stdout());
            Ok(())
        }

        // Ping reports reachability itself instead of failing at start
        Command::Ping => {
            let sync = config::build_sync_config(&cli.global)?;
            commands::ping::handle(&sync, &cli.global).await
        }

        // Watch keeps the poll timer running until interrupted
        Command::Watch(args) => {
            let sync = config::with_poll_interval(
                config::build_sync_config(&cli.global)?,
                args.interval,
            );
            commands::watch::handle(sync, &cli.global).await
        }

        cmd => {
            let mut sync = config::build_sync_config(&cli.global)?;
            sync.poll_interval = Duration::ZERO;
            if let Command::Refresh(ref args) = cmd {
                commands::refresh::apply_timing(&mut sync, args);
            }
            let controller = Controller::new(sync)?;
            controller.start().await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &controller, &cli.global).await;
            controller.shutdown().await;
            result
        }
    }
}
