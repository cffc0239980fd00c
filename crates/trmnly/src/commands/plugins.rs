//! Plugin command handlers (hosted only).

use trmnly_core::{Command as CoreCommand, Controller, CoreError};

use crate::cli::{GlobalOpts, PluginArgs, PluginCommand};
use crate::error::CliError;

use super::util;

pub async fn handle(
    controller: &Controller,
    args: PluginArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PluginCommand::Switch { plugin_id } => {
            controller
                .execute(CoreCommand::SwitchPlugin { plugin_id })
                .await?;
            if !global.quiet {
                eprintln!("Plugin switched");
            }
            Ok(())
        }

        PluginCommand::Notify {
            plugin_uuid,
            title,
            message,
        } => {
            controller
                .execute(CoreCommand::SendNotification {
                    plugin_uuid,
                    title,
                    message,
                })
                .await?;
            if !global.quiet {
                eprintln!("Notification sent");
            }
            Ok(())
        }

        PluginCommand::Push {
            plugin_uuid,
            data,
            from_file,
        } => {
            let vars = match (data, from_file) {
                (Some(inline), _) => serde_json::from_str(&inline)?,
                (None, Some(path)) => util::read_json_file(&path)?,
                (None, None) => {
                    return Err(CliError::Validation {
                        field: "data".into(),
                        reason: "pass --data or --from-file".into(),
                    });
                }
            };
            util::plugins(controller, "push plugin data")?
                .push_plugin_data(&plugin_uuid, vars)
                .await
                .map_err(CoreError::from)?;
            if !global.quiet {
                eprintln!("Plugin data pushed");
            }
            Ok(())
        }
    }
}
