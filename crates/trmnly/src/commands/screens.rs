//! Screen command handlers (self-hosted only).

use tabled::Tabled;
use trmnly_core::{
    AssignmentOutcome, Command as CoreCommand, CommandResult, Controller, CoreError, NewScreen,
    Screen, ScreenImage,
};

use crate::cli::{GlobalOpts, ScreensArgs, ScreensCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct ScreenRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Label")]
    label: String,
    #[tabled(rename = "Model")]
    model: String,
}

impl From<&Screen> for ScreenRow {
    fn from(s: &Screen) -> Self {
        Self {
            id: s.id,
            name: s.name.clone().unwrap_or_default(),
            label: s.label.clone().unwrap_or_default(),
            model: s.model_id.map(|m| m.to_string()).unwrap_or_default(),
        }
    }
}

pub(super) fn assignment_detail(o: &AssignmentOutcome) -> String {
    match o {
        AssignmentOutcome::Assigned { attempt, shape } => {
            format!("Assigned via '{}' (attempt {attempt})", shape.field())
        }
        AssignmentOutcome::Unassigned { attempts } => {
            let mut lines = vec!["Screen stored but not assigned; the server rejected every field:".to_owned()];
            lines.extend(
                attempts
                    .iter()
                    .map(|a| format!("  {}: {}", a.shape.field(), a.error)),
            );
            lines.join("\n")
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    controller: &Controller,
    args: ScreensArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ScreensCommand::List => {
            let screens = util::management(controller, "list screens")?
                .list_screens()
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &screens,
                |s| ScreenRow::from(s),
                |s| s.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ScreensCommand::Create {
            name,
            file,
            label,
            model_id,
        } => {
            let bytes = std::fs::read(&file)?;
            let new = NewScreen {
                name,
                label,
                model_id,
                image: ScreenImage::from_bytes(&bytes),
            };
            let result = controller.execute(CoreCommand::CreateScreen(new)).await?;
            if let CommandResult::Screen(screen) = result {
                let out = output::render_single(
                    &global.output,
                    &screen,
                    |s| format!("Created screen {}", s.id),
                    |s| s.id.to_string(),
                );
                output::print_output(&out, global.quiet);
            }
            Ok(())
        }

        ScreensCommand::Delete { screen } => {
            if !util::confirm(&format!("Delete screen {screen}?"), global.yes)? {
                return Ok(());
            }
            controller
                .execute(CoreCommand::DeleteScreen { key: screen })
                .await?;
            if !global.quiet {
                eprintln!("Screen deleted");
            }
            Ok(())
        }

        ScreensCommand::Assign {
            device,
            screen_id,
            label,
        } => {
            let result = controller
                .execute(CoreCommand::AssignScreen {
                    device_id: device,
                    screen_id,
                    label,
                })
                .await?;
            if let CommandResult::Assignment(outcome) = result {
                let out = output::render_single(&global.output, &outcome, assignment_detail, |o| {
                    o.is_assigned().to_string()
                });
                output::print_output(&out, global.quiet);
            }
            Ok(())
        }
    }
}
