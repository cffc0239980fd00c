// Self-hosted hardware model endpoints

use serde_json::json;
use tracing::{debug, warn};

use crate::error::Error;
use crate::models::{Model, ModelPatch, NewModel};
use crate::self_hosted::client::{SelfHostedClient, lenient_list};

impl SelfHostedClient {
    /// `GET /api/models`
    pub async fn fetch_models(&self) -> Result<Vec<Model>, Error> {
        debug!("listing models");
        let raw = self.transport.get("/api/models").await?;
        Ok(lenient_list(&raw, "models"))
    }

    async fn require_model(&self, key: &str) -> Result<Model, Error> {
        self.fetch_models()
            .await?
            .into_iter()
            .find(|m| m.matches(key))
            .ok_or_else(|| Error::NotFound {
                path: format!("/api/models/{key}"),
            })
    }

    /// `POST /api/models` with `{"model": {...}}`
    pub async fn post_model(&self, model: &NewModel) -> Result<Model, Error> {
        debug!(name = %model.name, "creating model");
        let raw = self
            .transport
            .post("/api/models", &json!({ "model": model }))
            .await?;

        if !raw.is_marker() {
            match raw.into_data::<Model>() {
                Ok(created) => return Ok(created),
                Err(e) => warn!(error = %e, "create response did not decode, re-listing"),
            }
        }
        self.require_model(&model.name).await
    }

    /// `PATCH /api/models/{id}` with `{"model": {...}}`
    pub async fn patch_model(&self, key: &str, patch: &ModelPatch) -> Result<(), Error> {
        let model = self.require_model(key).await?;
        debug!(key, id = model.id, "updating model");
        self.transport
            .patch(
                &format!("/api/models/{}", model.id),
                &json!({ "model": patch }),
            )
            .await?;
        Ok(())
    }

    /// `DELETE /api/models/{id}`
    pub async fn remove_model(&self, key: &str) -> Result<(), Error> {
        let model = self.require_model(key).await?;
        debug!(key, id = model.id, "deleting model");
        self.transport
            .delete(&format!("/api/models/{}", model.id))
            .await?;
        Ok(())
    }
}
