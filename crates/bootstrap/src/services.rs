//! Collaborator interfaces consumed by the bootstrap.
//!
//! Each trait has a `Noop` implementation that returns empty/default
//! responses, so the gateway can run standalone before real stores and
//! resolvers are wired in.

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{FetchedImage, HostedResolution, ModelDescriptor, Profile, Workspace};

/// Error type returned by collaborator methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("not found: {what}")]
    NotFound { what: String },
    #[error("{context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

// ── Profiles ────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` and `Err(NotFound)` both mean "no profile". Other errors
    /// are logged as lookup failures; both redirect to login.
    async fn get_profile(&self, subject: &str) -> ServiceResult<Option<Profile>>;
}

pub struct NoopProfileStore;

#[async_trait]
impl ProfileStore for NoopProfileStore {
    async fn get_profile(&self, _subject: &str) -> ServiceResult<Option<Profile>> {
        Ok(None)
    }
}

// ── Workspaces ──────────────────────────────────────────────────────────────

#[async_trait]
pub trait WorkspaceStore: Send + Sync {
    async fn list_workspaces(&self, subject: &str) -> ServiceResult<Vec<Workspace>>;
    /// Resolve an opaque image reference to a retrievable URL.
    async fn resolve_image_url(&self, reference: &str) -> ServiceResult<Option<String>>;
}

pub struct NoopWorkspaceStore;

#[async_trait]
impl WorkspaceStore for NoopWorkspaceStore {
    async fn list_workspaces(&self, _subject: &str) -> ServiceResult<Vec<Workspace>> {
        Ok(Vec::new())
    }

    async fn resolve_image_url(&self, _reference: &str) -> ServiceResult<Option<String>> {
        Ok(None)
    }
}

// ── Images ──────────────────────────────────────────────────────────────────

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ServiceResult<FetchedImage>;
}

pub struct NoopImageFetcher;

#[async_trait]
impl ImageFetcher for NoopImageFetcher {
    async fn fetch(&self, url: &str) -> ServiceResult<FetchedImage> {
        Err(format!("image fetching not configured ({url})").into())
    }
}

// ── Model providers ─────────────────────────────────────────────────────────

#[async_trait]
pub trait HostedModelResolver: Send + Sync {
    /// Combine profile keys with operator keys into availability + models.
    async fn resolve(&self, profile: &Profile) -> ServiceResult<HostedResolution>;
}

pub struct NoopHostedModelResolver;

#[async_trait]
impl HostedModelResolver for NoopHostedModelResolver {
    async fn resolve(&self, _profile: &Profile) -> ServiceResult<HostedResolution> {
        Ok(HostedResolution::default())
    }
}

/// A flat model catalog (local server or marketplace).
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    async fn list_models(&self) -> ServiceResult<Vec<ModelDescriptor>>;
}

pub struct NoopModelCatalog;

#[async_trait]
impl ModelCatalog for NoopModelCatalog {
    async fn list_models(&self) -> ServiceResult<Vec<ModelDescriptor>> {
        Ok(Vec::new())
    }
}

// ── Bundle ──────────────────────────────────────────────────────────────────

/// Everything the bootstrap talks to.
#[derive(Clone)]
pub struct BootstrapServices {
    pub profiles: Arc<dyn ProfileStore>,
    pub workspaces: Arc<dyn WorkspaceStore>,
    pub images: Arc<dyn ImageFetcher>,
    pub hosted: Arc<dyn HostedModelResolver>,
    pub local: Arc<dyn ModelCatalog>,
    pub marketplace: Arc<dyn ModelCatalog>,
}

impl BootstrapServices {
    pub fn noop() -> Self {
        Self {
            profiles: Arc::new(NoopProfileStore),
            workspaces: Arc::new(NoopWorkspaceStore),
            images: Arc::new(NoopImageFetcher),
            hosted: Arc::new(NoopHostedModelResolver),
            local: Arc::new(NoopModelCatalog),
            marketplace: Arc::new(NoopModelCatalog),
        }
    }

    #[must_use]
    pub fn with_profiles(mut self, profiles: Arc<dyn ProfileStore>) -> Self {
        self.profiles = profiles;
        self
    }

    #[must_use]
    pub fn with_workspaces(mut self, workspaces: Arc<dyn WorkspaceStore>) -> Self {
        self.workspaces = workspaces;
        self
    }

    #[must_use]
    pub fn with_images(mut self, images: Arc<dyn ImageFetcher>) -> Self {
        self.images = images;
        self
    }

    #[must_use]
    pub fn with_hosted(mut self, hosted: Arc<dyn HostedModelResolver>) -> Self {
        self.hosted = hosted;
        self
    }

    #[must_use]
    pub fn with_local(mut self, local: Arc<dyn ModelCatalog>) -> Self {
        self.local = local;
        self
    }

    #[must_use]
    pub fn with_marketplace(mut self, marketplace: Arc<dyn ModelCatalog>) -> Self {
        self.marketplace = marketplace;
        self
    }
}
