//! Shared state container populated by the bootstrap.
//!
//! Every slice is readable by anyone (`get` / `subscribe`). Writes are
//! restricted: bootstrap-derived slices change only through a
//! [`BootstrapWriter`], and the interactive slices through the named entry
//! points on [`SharedState`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use {serde::Serialize, tokio::sync::watch};

use crate::model::{ModelDescriptor, Profile, ProviderAvailabilityMap, Workspace, WorkspaceImage};

/// One named value with change notification.
pub struct Slice<T> {
    tx: watch::Sender<T>,
}

impl<T: Clone> Slice<T> {
    fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self { tx }
    }

    /// Clone of the current value.
    pub fn get(&self) -> T {
        self.tx.borrow().clone()
    }

    /// Receiver that observes every subsequent replacement.
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.tx.subscribe()
    }

    fn replace(&self, value: T) {
        self.tx.send_replace(value);
    }
}

impl<T: Clone + Default> Slice<T> {
    fn reset(&self) {
        self.replace(T::default());
    }
}

/// Serializable copy of every slice at one instant.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub profile: Option<Profile>,
    pub provider_availability: ProviderAvailabilityMap,
    pub hosted_models: Vec<ModelDescriptor>,
    pub local_models: Vec<ModelDescriptor>,
    pub marketplace_models: Vec<ModelDescriptor>,
    pub workspaces: Vec<Workspace>,
    pub workspace_images: Vec<WorkspaceImage>,
    pub selected_workspace_id: Option<String>,
}

pub struct SharedState {
    profile: Slice<Option<Profile>>,
    provider_availability: Slice<ProviderAvailabilityMap>,
    hosted_models: Slice<Vec<ModelDescriptor>>,
    local_models: Slice<Vec<ModelDescriptor>>,
    marketplace_models: Slice<Vec<ModelDescriptor>>,
    workspaces: Slice<Vec<Workspace>>,
    workspace_images: Slice<Vec<WorkspaceImage>>,
    selected_workspace: Slice<Option<Workspace>>,
    /// Bumped by every bootstrap start and logout. Writers from older
    /// generations are ignored.
    generation: Mutex<u64>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            profile: Slice::new(None),
            provider_availability: Slice::new(ProviderAvailabilityMap::new()),
            hosted_models: Slice::new(Vec::new()),
            local_models: Slice::new(Vec::new()),
            marketplace_models: Slice::new(Vec::new()),
            workspaces: Slice::new(Vec::new()),
            workspace_images: Slice::new(Vec::new()),
            selected_workspace: Slice::new(None),
            generation: Mutex::new(0),
        }
    }
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn profile(&self) -> &Slice<Option<Profile>> {
        &self.profile
    }

    pub fn provider_availability(&self) -> &Slice<ProviderAvailabilityMap> {
        &self.provider_availability
    }

    pub fn hosted_models(&self) -> &Slice<Vec<ModelDescriptor>> {
        &self.hosted_models
    }

    pub fn local_models(&self) -> &Slice<Vec<ModelDescriptor>> {
        &self.local_models
    }

    pub fn marketplace_models(&self) -> &Slice<Vec<ModelDescriptor>> {
        &self.marketplace_models
    }

    pub fn workspaces(&self) -> &Slice<Vec<Workspace>> {
        &self.workspaces
    }

    pub fn workspace_images(&self) -> &Slice<Vec<WorkspaceImage>> {
        &self.workspace_images
    }

    pub fn selected_workspace(&self) -> &Slice<Option<Workspace>> {
        &self.selected_workspace
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            profile: self.profile.get(),
            provider_availability: self.provider_availability.get(),
            hosted_models: self.hosted_models.get(),
            local_models: self.local_models.get(),
            marketplace_models: self.marketplace_models.get(),
            workspaces: self.workspaces.get(),
            workspace_images: self.workspace_images.get(),
            selected_workspace_id: self.selected_workspace.get().map(|w| w.id),
        }
    }

    /// Start a new bootstrap run.
    ///
    /// Invalidates any earlier writer and resets the bootstrap-owned slices,
    /// so results of the previous run are superseded rather than merged.
    pub fn begin_bootstrap(self: &Arc<Self>) -> BootstrapWriter {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.reset_bootstrap_slices();
        BootstrapWriter {
            state: Arc::clone(self),
            generation: *generation,
        }
    }

    /// Logout: drop everything and invalidate any in-flight writer.
    pub fn clear(&self) {
        let mut generation = self.lock_generation();
        *generation += 1;
        self.reset_bootstrap_slices();
        self.selected_workspace.replace(None);
    }

    /// Select a workspace from the cached list. Returns false if `id` is not
    /// one of the current workspaces.
    pub fn select_workspace(&self, id: &str) -> bool {
        let _generation = self.lock_generation();
        let Some(workspace) = self.workspaces.get().into_iter().find(|w| w.id == id) else {
            return false;
        };
        self.selected_workspace.replace(Some(workspace));
        true
    }

    fn reset_bootstrap_slices(&self) {
        self.profile.reset();
        self.provider_availability.reset();
        self.hosted_models.reset();
        self.local_models.reset();
        self.marketplace_models.reset();
        self.workspaces.reset();
        self.workspace_images.reset();
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive write handle for one bootstrap run.
///
/// Every write returns `false` (and changes nothing) once a newer run has
/// started or the state was cleared.
pub struct BootstrapWriter {
    state: Arc<SharedState>,
    generation: u64,
}

impl BootstrapWriter {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        *self.state.lock_generation() == self.generation
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn set_profile(&self, profile: Option<Profile>) -> bool {
        self.write(|s| s.profile.replace(profile))
    }

    pub fn set_provider_availability(&self, availability: ProviderAvailabilityMap) -> bool {
        self.write(|s| s.provider_availability.replace(availability))
    }

    pub fn set_hosted_models(&self, models: Vec<ModelDescriptor>) -> bool {
        self.write(|s| s.hosted_models.replace(models))
    }

    pub fn set_local_models(&self, models: Vec<ModelDescriptor>) -> bool {
        self.write(|s| s.local_models.replace(models))
    }

    pub fn set_marketplace_models(&self, models: Vec<ModelDescriptor>) -> bool {
        self.write(|s| s.marketplace_models.replace(models))
    }

    pub fn set_workspaces(&self, workspaces: Vec<Workspace>) -> bool {
        self.write(|s| s.workspaces.replace(workspaces))
    }

    /// Append one image. The merge happens here; the slice itself is
    /// replaced wholesale.
    pub fn push_workspace_image(&self, image: WorkspaceImage) -> bool {
        self.write(|s| {
            let mut images = s.workspace_images.get();
            images.push(image);
            s.workspace_images.replace(images);
        })
    }

    /// Keep the current selection if it survived the refresh, otherwise
    /// fall back to the home workspace, then the first one.
    pub fn select_default_workspace(&self) -> bool {
        self.write(|s| {
            let workspaces = s.workspaces.get();
            let current = s.selected_workspace.get();
            let keep = current
                .as_ref()
                .and_then(|c| workspaces.iter().find(|w| w.id == c.id));
            let next = keep
                .or_else(|| workspaces.iter().find(|w| w.is_home))
                .or_else(|| workspaces.first())
                .cloned();
            s.selected_workspace.replace(next);
        })
    }

    fn write(&self, apply: impl FnOnce(&SharedState)) -> bool {
        let generation = self.state.lock_generation();
        if *generation != self.generation {
            return false;
        }
        apply(&self.state);
        true
    }
}
