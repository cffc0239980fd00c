//! Connectivity check.

use trmnly_core::{SyncConfig, connect};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(config: &SyncConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let backend = connect(config)?;
    if backend.test_connection().await {
        output::print_output(
            &format!("ok: {} ({})", config.url, backend.flavor()),
            global.quiet,
        );
        Ok(())
    } else {
        Err(CliError::ConnectionFailed {
            url: config.url.to_string(),
            source: "server did not answer the connection test".into(),
        })
    }
}
