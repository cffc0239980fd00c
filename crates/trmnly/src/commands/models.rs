//! Model command handlers (self-hosted only).

use tabled::Tabled;
use trmnly_core::{Controller, CoreError, Model};

use crate::cli::{GlobalOpts, ModelsArgs, ModelsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ModelRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Size")]
    size: String,
}

impl From<&Model> for ModelRow {
    fn from(m: &Model) -> Self {
        Self {
            id: m.id,
            name: m.display_name(),
            size: match (m.width, m.height) {
                (Some(w), Some(h)) => format!("{w}x{h}"),
                _ => String::new(),
            },
        }
    }
}

pub async fn handle(
    controller: &Controller,
    args: ModelsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ModelsCommand::List => {
            let models = util::management(controller, "list models")?
                .list_models()
                .await
                .map_err(CoreError::from)?;
            let out = output::render_list(
                &global.output,
                &models,
                |m| ModelRow::from(m),
                |m| m.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
