//! Marketplace catalog (OpenRouter `GET /models`).

use {
    async_trait::async_trait,
    gatehouse_bootstrap::{
        ModelDescriptor, ModelSource, ServiceResult, model::MARKETPLACE_PROVIDER,
        services::ModelCatalog,
    },
    serde::Deserialize,
    tracing::debug,
};

use crate::error::{Error, Result};

const PLATFORM_LINK: &str = "https://openrouter.ai/docs";

#[derive(Debug, Deserialize)]
struct ModelsPayload {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    context_length: Option<u32>,
    #[serde(default)]
    architecture: Option<Architecture>,
}

#[derive(Debug, Default, Deserialize)]
struct Architecture {
    #[serde(default)]
    input_modalities: Vec<String>,
}

pub struct OpenRouterModelCatalog {
    base_url: String,
    client: reqwest::Client,
}

impl OpenRouterModelCatalog {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            client,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<ModelDescriptor>> {
        let endpoint = format!("{}/models", self.base_url);
        let response = self.client.get(&endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                context: "marketplace model catalog",
                status,
            });
        }

        let payload: ModelsPayload = response.json().await?;
        let models: Vec<ModelDescriptor> = payload
            .data
            .into_iter()
            .filter(|entry| !entry.id.trim().is_empty())
            .map(|entry| {
                let image_input = entry
                    .architecture
                    .as_ref()
                    .is_some_and(|a| a.input_modalities.iter().any(|m| m == "image"));
                let name = entry
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| entry.id.clone());
                ModelDescriptor::new(entry.id, name, MARKETPLACE_PROVIDER, ModelSource::Marketplace)
                    .with_image_input(image_input)
                    .with_max_context(entry.context_length)
                    .with_platform_link(PLATFORM_LINK)
            })
            .collect();
        debug!(endpoint, count = models.len(), "fetched marketplace models");
        Ok(models)
    }
}

#[async_trait]
impl ModelCatalog for OpenRouterModelCatalog {
    async fn list_models(&self) -> ServiceResult<Vec<ModelDescriptor>> {
        Ok(self.fetch().await?)
    }
}
