//! Model provider resolvers and the HTTP image fetcher used by the session
//! bootstrap.

pub mod error;
pub mod hosted;
pub mod images;
pub mod ollama;
pub mod openrouter;

use std::{sync::Arc, time::Duration};

use {
    gatehouse_bootstrap::{
        BootstrapServices,
        services::{ProfileStore, WorkspaceStore},
    },
    gatehouse_config::GatehouseConfig,
};

pub use {
    error::{Error, Result},
    hosted::CatalogHostedResolver,
    images::HttpImageFetcher,
    ollama::OllamaModelCatalog,
    openrouter::OpenRouterModelCatalog,
};

pub(crate) fn client_with_timeout(secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(secs.max(1)))
        .build()?)
}

/// Wire the real resolvers from config around the given stores.
pub fn live_services(
    config: &GatehouseConfig,
    profiles: Arc<dyn ProfileStore>,
    workspaces: Arc<dyn WorkspaceStore>,
) -> Result<BootstrapServices> {
    let providers = &config.providers;
    Ok(BootstrapServices::noop()
        .with_profiles(profiles)
        .with_workspaces(workspaces)
        .with_images(Arc::new(HttpImageFetcher::new(client_with_timeout(
            providers.images.timeout_secs,
        )?)))
        .with_hosted(Arc::new(CatalogHostedResolver::new(providers.clone())))
        .with_local(Arc::new(OllamaModelCatalog::new(
            &providers.local.base_url,
            client_with_timeout(providers.local.timeout_secs)?,
        )))
        .with_marketplace(Arc::new(OpenRouterModelCatalog::new(
            &providers.marketplace.base_url,
            client_with_timeout(providers.marketplace.timeout_secs)?,
        ))))
}
