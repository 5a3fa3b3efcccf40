use std::sync::Arc;

use base64::Engine;

use crate::{
    model::{FetchedImage, Workspace, WorkspaceImage},
    services::{ImageFetcher, ServiceResult, WorkspaceStore},
};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Turns a workspace's image reference into a displayable [`WorkspaceImage`].
#[derive(Clone)]
pub struct WorkspaceImageHydrator {
    store: Arc<dyn WorkspaceStore>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl WorkspaceImageHydrator {
    pub fn new(store: Arc<dyn WorkspaceStore>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// `Ok(None)` when the workspace has no image or the reference does not
    /// resolve to a URL.
    pub async fn hydrate(&self, workspace: &Workspace) -> ServiceResult<Option<WorkspaceImage>> {
        let Some(reference) = workspace
            .image_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        else {
            return Ok(None);
        };

        let Some(url) = self
            .store
            .resolve_image_url(reference)
            .await?
            .filter(|u| !u.is_empty())
        else {
            return Ok(None);
        };

        let image = self.fetcher.fetch(&url).await?;

        Ok(Some(WorkspaceImage {
            workspace_id: workspace.id.clone(),
            path: reference.to_string(),
            base64: encode_data_url(&image),
            url,
        }))
    }
}

/// `data:<mime>;base64,<payload>`
pub fn encode_data_url(image: &FetchedImage) -> String {
    let mime = image
        .content_type
        .as_deref()
        .map(|ct| ct.split(';').next().unwrap_or(ct).trim())
        .filter(|ct| !ct.is_empty())
        .unwrap_or(FALLBACK_MIME);
    let payload = base64::engine::general_purpose::STANDARD.encode(&image.bytes);
    format!("data:{mime};base64,{payload}")
}
