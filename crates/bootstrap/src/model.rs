//! Domain types shared by the bootstrap pipeline and its collaborators.

use std::collections::BTreeMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Provider name of the marketplace catalog.
pub const MARKETPLACE_PROVIDER: &str = "openrouter";

/// Externally issued proof of identity. Never mutated here.
#[derive(Debug, Clone)]
pub struct Session {
    pub subject: String,
}

impl Session {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
        }
    }
}

/// Per-user persisted record. `has_onboarded` is read-only to the bootstrap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub subject: String,
    pub username: String,
    pub display_name: String,
    pub has_onboarded: bool,
    /// User-supplied provider keys. Never serialized back out.
    #[serde(skip_serializing)]
    pub api_keys: BTreeMap<String, Secret<String>>,
}

impl Profile {
    pub fn has_api_key(&self, provider: &str) -> bool {
        self.api_keys
            .get(provider)
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

/// Where a provider's credential comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    Environment,
    User,
}

/// Provider name → credential source. Rebuilt on every bootstrap.
pub type ProviderAvailabilityMap = BTreeMap<String, CredentialSource>;

/// Which resolver produced a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelSource {
    Hosted,
    Local,
    Marketplace,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub image_input: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_context: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub source: ModelSource,
    #[serde(default)]
    pub capabilities: ModelCapabilities,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_link: Option<String>,
}

impl ModelDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
        source: ModelSource,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            provider: provider.into(),
            source,
            capabilities: ModelCapabilities::default(),
            platform_link: None,
        }
    }

    #[must_use]
    pub fn with_image_input(mut self, image_input: bool) -> Self {
        self.capabilities.image_input = image_input;
        self
    }

    #[must_use]
    pub fn with_max_context(mut self, max_context: Option<u32>) -> Self {
        self.capabilities.max_context = max_context;
        self
    }

    #[must_use]
    pub fn with_platform_link(mut self, link: impl Into<String>) -> Self {
        self.platform_link = Some(link.into());
        self
    }
}

/// Result of hosted-provider resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostedResolution {
    pub availability: ProviderAvailabilityMap,
    pub models: Vec<ModelDescriptor>,
}

/// Owned by the persistence layer; the bootstrap only caches it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub is_home: bool,
    /// Opaque storage reference, resolved to a URL by the workspace store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// A workspace's image, fetched and encoded for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceImage {
    pub workspace_id: String,
    pub path: String,
    /// `data:<mime>;base64,<payload>`
    pub base64: String,
    pub url: String,
}

/// Raw bytes returned by an image fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}
