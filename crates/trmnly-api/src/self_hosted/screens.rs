// Self-hosted screen endpoints

use serde_json::json;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{NewScreen, Screen, ScreenPatch};
use crate::self_hosted::client::{SelfHostedClient, lenient_list};

impl SelfHostedClient {
    /// List all screens.
    ///
    /// `GET /api/screens`
    pub async fn fetch_screens(&self) -> Result<Vec<Screen>, Error> {
        debug!("listing screens");
        let raw = self.transport.get("/api/screens").await?;
        Ok(lenient_list(&raw, "screens"))
    }

    async fn require_screen(&self, key: &str) -> Result<Screen, Error> {
        self.fetch_screens()
            .await?
            .into_iter()
            .find(|s| s.matches(key))
            .ok_or_else(|| Error::NotFound {
                path: format!("/api/screens/{key}"),
            })
    }

    /// Create a screen from a base64 image.
    ///
    /// `POST /api/screens` with `{"screen": {...}}`
    pub async fn post_screen(&self, screen: &NewScreen) -> Result<Screen, Error> {
        debug!(name = %screen.name, "creating screen");
        let raw = self
            .transport
            .post("/api/screens", &json!({ "screen": screen }))
            .await?;

        if !raw.is_marker() {
            match raw.into_data::<Screen>() {
                Ok(created) => return Ok(created),
                Err(e) => warn!(error = %e, "create response did not decode, re-listing"),
            }
        }
        self.require_screen(&screen.name).await
    }

    /// `PATCH /api/screens/{id}` with `{"screen": {...}}`
    pub async fn patch_screen(&self, key: &str, patch: &ScreenPatch) -> Result<(), Error> {
        let screen = self.require_screen(key).await?;
        debug!(key, id = screen.id, "updating screen");
        self.transport
            .patch(
                &format!("/api/screens/{}", screen.id),
                &json!({ "screen": patch }),
            )
            .await?;
        Ok(())
    }

    /// `DELETE /api/screens/{id}`
    pub async fn remove_screen(&self, key: &str) -> Result<(), Error> {
        let screen = self.require_screen(key).await?;
        debug!(key, id = screen.id, "deleting screen");
        self.transport
            .delete(&format!("/api/screens/{}", screen.id))
            .await?;
        Ok(())
    }
}
