//! In-memory profile/workspace store, loadable from a JSON fixture.
//!
//! ```json
//! {
//!   "profiles": [{ "subject": "u1", "hasOnboarded": true }],
//!   "workspaces": { "u1": [{ "id": "w1", "name": "Home", "isHome": true }] },
//!   "imageUrls": { "w1/avatar.png": "https://cdn.example.com/w1.png" }
//! }
//! ```

use std::{collections::HashMap, path::Path};

use {async_trait::async_trait, serde::Deserialize};

use crate::{
    model::{Profile, Workspace},
    services::{ProfileStore, ServiceError, ServiceResult, WorkspaceStore},
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct Fixture {
    profiles: Vec<Profile>,
    workspaces: HashMap<String, Vec<Workspace>>,
    image_urls: HashMap<String, String>,
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    profiles: HashMap<String, Profile>,
    workspaces: HashMap<String, Vec<Workspace>>,
    image_urls: HashMap<String, String>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> ServiceResult<Self> {
        let fixture: Fixture = serde_json::from_str(raw)
            .map_err(|e| ServiceError::external("invalid store fixture", e))?;
        Ok(Self {
            profiles: fixture
                .profiles
                .into_iter()
                .map(|p| (p.subject.clone(), p))
                .collect(),
            workspaces: fixture.workspaces,
            image_urls: fixture.image_urls,
        })
    }

    pub fn load(path: &Path) -> ServiceResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ServiceError::external(format!("failed to read {}", path.display()), e))?;
        Self::from_json(&raw)
    }

    #[must_use]
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profiles.insert(profile.subject.clone(), profile);
        self
    }

    #[must_use]
    pub fn with_workspace(mut self, subject: impl Into<String>, workspace: Workspace) -> Self {
        self.workspaces
            .entry(subject.into())
            .or_default()
            .push(workspace);
        self
    }

    #[must_use]
    pub fn with_image_url(mut self, reference: impl Into<String>, url: impl Into<String>) -> Self {
        self.image_urls.insert(reference.into(), url.into());
        self
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

#[async_trait]
impl ProfileStore for InMemoryStore {
    async fn get_profile(&self, subject: &str) -> ServiceResult<Option<Profile>> {
        self.profiles
            .get(subject)
            .cloned()
            .map(Some)
            .ok_or_else(|| ServiceError::not_found(format!("profile for subject {subject}")))
    }
}

#[async_trait]
impl WorkspaceStore for InMemoryStore {
    async fn list_workspaces(&self, subject: &str) -> ServiceResult<Vec<Workspace>> {
        Ok(self.workspaces.get(subject).cloned().unwrap_or_default())
    }

    async fn resolve_image_url(&self, reference: &str) -> ServiceResult<Option<String>> {
        Ok(self.image_urls.get(reference).cloned())
    }
}
