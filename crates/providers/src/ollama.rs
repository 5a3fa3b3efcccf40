//! Local model discovery against an Ollama server (`GET /api/tags`).

use {
    async_trait::async_trait,
    gatehouse_bootstrap::{ModelDescriptor, ModelSource, ServiceResult, services::ModelCatalog},
    tracing::debug,
};

use crate::error::{Error, Result};

pub const PROVIDER: &str = "ollama";

#[derive(Debug, serde::Deserialize)]
struct OllamaTagEntry {
    name: String,
}

#[derive(Debug, serde::Deserialize)]
struct OllamaTagsPayload {
    #[serde(default)]
    models: Vec<OllamaTagEntry>,
}

pub struct OllamaModelCatalog {
    api_base: String,
    client: reqwest::Client,
}

impl OllamaModelCatalog {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            api_base: normalize_api_base_url(base_url),
            client,
        }
    }

    pub async fn discover(&self) -> Result<Vec<ModelDescriptor>> {
        let endpoint = format!("{}/api/tags", self.api_base);
        let response = self.client.get(&endpoint).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                context: "ollama model discovery",
                status,
            });
        }

        let payload: OllamaTagsPayload = response.json().await?;
        let mut names: Vec<String> = payload
            .models
            .into_iter()
            .map(|entry| entry.name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        debug!(endpoint, count = names.len(), "discovered ollama models");

        Ok(names
            .into_iter()
            .map(|name| ModelDescriptor::new(name.clone(), name, PROVIDER, ModelSource::Local))
            .collect())
    }
}

#[async_trait]
impl ModelCatalog for OllamaModelCatalog {
    async fn list_models(&self) -> ServiceResult<Vec<ModelDescriptor>> {
        Ok(self.discover().await?)
    }
}

/// Accept both the native root and the OpenAI-compatible `/v1` base.
fn normalize_api_base_url(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed).to_string()
}
