//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod dashboard;
pub mod devices;
pub mod display;
pub mod models;
pub mod ping;
pub mod plugins;
pub mod refresh;
pub mod screens;
pub mod util;
pub mod watch;

use trmnly_core::Controller;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a server-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    controller: &Controller,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Devices(args) => devices::handle(controller, args, global).await,
        Command::Refresh(args) => refresh::handle(controller, args, global).await,
        Command::Display { device } => display::handle(controller, &device, global).await,
        Command::Screens(args) => screens::handle(controller, args, global).await,
        Command::Models(args) => models::handle(controller, args, global).await,
        Command::Plugin(args) => plugins::handle(controller, args, global).await,
        Command::Dashboard(args) => dashboard::handle(controller, args, global).await,
        // Handled before a controller is built
        Command::Ping | Command::Watch(_) | Command::Config(_) | Command::Completions(_) => {
            unreachable!()
        }
    }
}
