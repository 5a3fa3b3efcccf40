//! Session bootstrap: assembles one consistent in-memory snapshot of a
//! user's profile, available model providers and workspaces before any
//! feature UI renders.

pub mod aggregator;
pub mod hydrator;
pub mod memory;
pub mod model;
pub mod services;
pub mod state;

pub use {
    aggregator::{BootstrapOptions, BootstrapOutcome, Bootstrapper, RedirectTarget},
    hydrator::WorkspaceImageHydrator,
    memory::InMemoryStore,
    model::{
        CredentialSource, FetchedImage, HostedResolution, ModelCapabilities, ModelDescriptor,
        ModelSource, Profile, ProviderAvailabilityMap, Session, Workspace, WorkspaceImage,
    },
    services::{BootstrapServices, ServiceError, ServiceResult},
    state::{BootstrapWriter, SharedState, Slice, StateSnapshot},
};
