//! Session bootstrap: turns a validated session into a populated
//! [`SharedState`], or a redirect.
//!
//! The steps run strictly in order and each may gate the next:
//!
//! 1. no session → login
//! 2. profile lookup; missing or failed → login
//! 3. not onboarded → onboarding
//! 4. hosted providers (availability map + hosted models)
//! 5. marketplace models, only when a marketplace key is known
//! 6. local models, only when the local provider is enabled
//! 7. workspace list
//! 8. workspace images, one at a time, each appended as soon as it resolves
//!
//! Failures in steps 4–8 degrade the affected slice to empty and the run
//! continues.

use std::sync::Arc;

use {
    gatehouse_config::GatehouseConfig,
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::{
    hydrator::WorkspaceImageHydrator,
    model::{CredentialSource, MARKETPLACE_PROVIDER, Profile, ProviderAvailabilityMap, Session},
    services::{BootstrapServices, ServiceError},
    state::{BootstrapWriter, SharedState},
};

/// Where a terminated bootstrap sends the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectTarget {
    Login,
    Onboarding,
}

/// Terminal state of one bootstrap run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// All slices populated (possibly with degraded, empty slices).
    Ready,
    Redirect { target: RedirectTarget, path: String },
    /// A newer run (or a logout) started before this one finished.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct BootstrapOptions {
    pub login_path: String,
    pub onboarding_path: String,
    /// Read once at startup; never derived from the profile.
    pub local_models_enabled: bool,
}

impl Default for BootstrapOptions {
    fn default() -> Self {
        let cfg = gatehouse_config::BootstrapConfig::default();
        Self {
            login_path: cfg.login_path,
            onboarding_path: cfg.onboarding_path,
            local_models_enabled: false,
        }
    }
}

impl BootstrapOptions {
    pub fn from_config(cfg: &GatehouseConfig) -> Self {
        Self {
            login_path: cfg.bootstrap.login_path.clone(),
            onboarding_path: cfg.bootstrap.onboarding_path.clone(),
            local_models_enabled: cfg.providers.local.enabled,
        }
    }
}

pub struct Bootstrapper {
    services: BootstrapServices,
    options: BootstrapOptions,
    hydrator: WorkspaceImageHydrator,
}

impl Bootstrapper {
    pub fn new(services: BootstrapServices, options: BootstrapOptions) -> Self {
        let hydrator =
            WorkspaceImageHydrator::new(Arc::clone(&services.workspaces), Arc::clone(&services.images));
        Self {
            services,
            options,
            hydrator,
        }
    }

    pub fn options(&self) -> &BootstrapOptions {
        &self.options
    }

    /// Run one bootstrap against `state`. Never fails: collaborator errors
    /// either redirect (profile) or degrade a slice (everything else).
    pub async fn run(&self, session: Option<&Session>, state: &Arc<SharedState>) -> BootstrapOutcome {
        let writer = state.begin_bootstrap();
        self.run_with(session, &writer).await
    }

    /// Run with a writer minted by the caller, so the caller can invalidate
    /// it from elsewhere.
    pub async fn run_with(&self, session: Option<&Session>, writer: &BootstrapWriter) -> BootstrapOutcome {
        let Some(session) = session else {
            info!("no session, redirecting to login");
            return self.redirect(RedirectTarget::Login);
        };
        let subject = session.subject.as_str();
        debug!(subject, generation = writer.generation(), "bootstrap started");

        let profile = match self.services.profiles.get_profile(subject).await {
            Ok(Some(profile)) => profile,
            Ok(None) | Err(ServiceError::NotFound { .. }) => {
                warn!(subject, "no profile for session subject, redirecting to login");
                return self.redirect(RedirectTarget::Login);
            },
            Err(e) => {
                warn!(subject, error = %e, "profile lookup failed, redirecting to login");
                return self.redirect(RedirectTarget::Login);
            },
        };
        if !writer.set_profile(Some(profile.clone())) {
            return BootstrapOutcome::Superseded;
        }

        if !profile.has_onboarded {
            info!(subject, "profile not onboarded, redirecting to onboarding");
            return self.redirect(RedirectTarget::Onboarding);
        }

        let availability = self.resolve_hosted(&profile, writer).await;
        if !writer.is_current() {
            return BootstrapOutcome::Superseded;
        }

        if wants_marketplace(&profile, &availability) {
            match self.services.marketplace.list_models().await {
                Ok(models) => {
                    debug!(count = models.len(), "marketplace models resolved");
                    writer.set_marketplace_models(models);
                },
                Err(e) => warn!(error = %e, "marketplace model lookup failed"),
            }
        } else {
            debug!("no marketplace credential, skipping marketplace models");
        }
        if !writer.is_current() {
            return BootstrapOutcome::Superseded;
        }

        if self.options.local_models_enabled {
            match self.services.local.list_models().await {
                Ok(models) => {
                    debug!(count = models.len(), "local models resolved");
                    writer.set_local_models(models);
                },
                Err(e) => warn!(error = %e, "local model lookup failed"),
            }
        }
        if !writer.is_current() {
            return BootstrapOutcome::Superseded;
        }

        let workspaces = match self.services.workspaces.list_workspaces(subject).await {
            Ok(workspaces) => workspaces,
            Err(e) => {
                warn!(subject, error = %e, "workspace listing failed, continuing with none");
                Vec::new()
            },
        };
        if workspaces.is_empty() {
            warn!(subject, "subject has no workspaces");
        }
        if !writer.set_workspaces(workspaces.clone()) || !writer.select_default_workspace() {
            return BootstrapOutcome::Superseded;
        }

        for workspace in &workspaces {
            if !writer.is_current() {
                return BootstrapOutcome::Superseded;
            }
            match self.hydrator.hydrate(workspace).await {
                Ok(Some(image)) => {
                    writer.push_workspace_image(image);
                },
                Ok(None) => {},
                Err(e) => {
                    warn!(workspace = %workspace.id, error = %e, "workspace image unavailable");
                },
            }
        }

        if !writer.is_current() {
            return BootstrapOutcome::Superseded;
        }
        info!(subject, workspaces = workspaces.len(), "bootstrap complete");
        BootstrapOutcome::Ready
    }

    /// Step 4. Returns the availability map that was written (empty on
    /// failure) so step 5 can consult it.
    async fn resolve_hosted(&self, profile: &Profile, writer: &BootstrapWriter) -> ProviderAvailabilityMap {
        match self.services.hosted.resolve(profile).await {
            Ok(resolution) => {
                debug!(
                    providers = resolution.availability.len(),
                    models = resolution.models.len(),
                    "hosted providers resolved"
                );
                writer.set_provider_availability(resolution.availability.clone());
                writer.set_hosted_models(resolution.models);
                resolution.availability
            },
            Err(e) => {
                warn!(error = %e, "hosted provider lookup failed");
                ProviderAvailabilityMap::new()
            },
        }
    }

    fn redirect(&self, target: RedirectTarget) -> BootstrapOutcome {
        let path = match target {
            RedirectTarget::Login => self.options.login_path.clone(),
            RedirectTarget::Onboarding => self.options.onboarding_path.clone(),
        };
        BootstrapOutcome::Redirect { target, path }
    }
}

fn wants_marketplace(profile: &Profile, availability: &ProviderAvailabilityMap) -> bool {
    profile.has_api_key(MARKETPLACE_PROVIDER)
        || availability.get(MARKETPLACE_PROVIDER) == Some(&CredentialSource::Environment)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::{
        collections::HashMap,
        sync::Mutex,
    };

    use {async_trait::async_trait, secrecy::Secret, tokio::sync::Notify};

    use {
        super::*,
        crate::{
            model::{FetchedImage, HostedResolution, ModelDescriptor, ModelSource, Workspace},
            services::{
                HostedModelResolver, ImageFetcher, ModelCatalog, ProfileStore, ServiceResult,
                WorkspaceStore,
            },
        },
    };

    /// Records every collaborator call in order.
    #[derive(Default)]
    struct Calls(Mutex<Vec<String>>);

    impl Calls {
        fn push(&self, call: impl Into<String>) {
            self.0.lock().unwrap().push(call.into());
        }

        fn list(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct Fake {
        calls: Arc<Calls>,
        profile: Option<Profile>,
        workspaces: ServiceResult<Vec<Workspace>>,
        hosted: Option<HostedResolution>,
        marketplace_fails: bool,
        local_fails: bool,
        image_urls: HashMap<String, String>,
        slow_url: Option<String>,
        gate: Arc<Notify>,
    }

    impl Default for Fake {
        fn default() -> Self {
            Self {
                calls: Arc::default(),
                profile: Some(onboarded_profile()),
                workspaces: Ok(Vec::new()),
                hosted: Some(HostedResolution::default()),
                marketplace_fails: false,
                local_fails: false,
                image_urls: HashMap::new(),
                slow_url: None,
                gate: Arc::new(Notify::new()),
            }
        }
    }

    #[async_trait]
    impl ProfileStore for Fake {
        async fn get_profile(&self, subject: &str) -> ServiceResult<Option<Profile>> {
            self.calls.push(format!("profile:{subject}"));
            match &self.profile {
                Some(profile) => Ok(Some(profile.clone())),
                None => Err(ServiceError::not_found(format!("profile {subject}"))),
            }
        }
    }

    #[async_trait]
    impl WorkspaceStore for Fake {
        async fn list_workspaces(&self, subject: &str) -> ServiceResult<Vec<Workspace>> {
            self.calls.push(format!("workspaces:{subject}"));
            match &self.workspaces {
                Ok(w) => Ok(w.clone()),
                Err(e) => Err(ServiceError::message(e)),
            }
        }

        async fn resolve_image_url(&self, reference: &str) -> ServiceResult<Option<String>> {
            self.calls.push(format!("resolve:{reference}"));
            Ok(self.image_urls.get(reference).cloned())
        }
    }

    #[async_trait]
    impl ImageFetcher for Fake {
        async fn fetch(&self, url: &str) -> ServiceResult<FetchedImage> {
            self.calls.push(format!("fetch:{url}"));
            if self.slow_url.as_deref() == Some(url) {
                self.gate.notified().await;
            }
            if url.contains("fail") {
                return Err("HTTP 500".into());
            }
            Ok(FetchedImage {
                bytes: url.as_bytes().to_vec(),
                content_type: Some("image/png".into()),
            })
        }
    }

    #[async_trait]
    impl HostedModelResolver for Fake {
        async fn resolve(&self, _profile: &Profile) -> ServiceResult<HostedResolution> {
            self.calls.push("hosted");
            self.hosted.clone().ok_or_else(|| "hosted down".into())
        }
    }

    struct Catalog {
        name: &'static str,
        calls: Arc<Calls>,
        fail: bool,
    }

    #[async_trait]
    impl ModelCatalog for Catalog {
        async fn list_models(&self) -> ServiceResult<Vec<ModelDescriptor>> {
            self.calls.push(self.name);
            if self.fail {
                return Err(format!("{} unreachable", self.name).into());
            }
            let source = if self.name == "local" {
                ModelSource::Local
            } else {
                ModelSource::Marketplace
            };
            Ok(vec![ModelDescriptor::new(
                format!("{}-model", self.name),
                "Model",
                self.name,
                source,
            )])
        }
    }

    fn onboarded_profile() -> Profile {
        Profile {
            subject: "u1".into(),
            username: "ada".into(),
            has_onboarded: true,
            ..Default::default()
        }
    }

    fn ws(id: &str, image: Option<&str>) -> Workspace {
        Workspace {
            id: id.into(),
            name: id.into(),
            image_path: image.map(str::to_string),
            ..Default::default()
        }
    }

    fn bootstrapper(fake: Fake, local_enabled: bool) -> (Bootstrapper, Arc<Calls>, Arc<Notify>) {
        let calls = Arc::clone(&fake.calls);
        let gate = Arc::clone(&fake.gate);
        let marketplace_fails = fake.marketplace_fails;
        let local_fails = fake.local_fails;
        let fake = Arc::new(fake);
        let services = BootstrapServices::noop()
            .with_profiles(fake.clone())
            .with_workspaces(fake.clone())
            .with_images(fake.clone())
            .with_hosted(fake)
            .with_local(Arc::new(Catalog {
                name: "local",
                calls: Arc::clone(&calls),
                fail: local_fails,
            }))
            .with_marketplace(Arc::new(Catalog {
                name: "marketplace",
                calls: Arc::clone(&calls),
                fail: marketplace_fails,
            }));
        let options = BootstrapOptions {
            local_models_enabled: local_enabled,
            ..Default::default()
        };
        (Bootstrapper::new(services, options), calls, gate)
    }

    fn env_openrouter() -> HostedResolution {
        HostedResolution {
            availability: ProviderAvailabilityMap::from([
                ("openai".to_string(), CredentialSource::User),
                (MARKETPLACE_PROVIDER.to_string(), CredentialSource::Environment),
            ]),
            models: vec![ModelDescriptor::new("gpt-4o", "GPT-4o", "openai", ModelSource::Hosted)],
        }
    }

    #[tokio::test]
    async fn absent_session_redirects_without_fetching() {
        let (b, calls, _) = bootstrapper(Fake::default(), true);
        let state = SharedState::new();
        let outcome = b.run(None, &state).await;
        assert_eq!(outcome, BootstrapOutcome::Redirect {
            target: RedirectTarget::Login,
            path: "/login".into(),
        });
        assert!(calls.list().is_empty());
    }

    #[tokio::test]
    async fn missing_profile_redirects_to_login() {
        let fake = Fake {
            profile: None,
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, true);
        let state = SharedState::new();
        let outcome = b.run(Some(&Session::new("u1")), &state).await;
        assert!(matches!(outcome, BootstrapOutcome::Redirect {
            target: RedirectTarget::Login,
            ..
        }));
        assert_eq!(calls.list(), ["profile:u1"]);
        assert!(state.profile().get().is_none());
    }

    #[tokio::test]
    async fn not_onboarded_redirects_after_single_profile_fetch() {
        let fake = Fake {
            profile: Some(Profile {
                has_onboarded: false,
                ..onboarded_profile()
            }),
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, true);
        let state = SharedState::new();
        let outcome = b.run(Some(&Session::new("u1")), &state).await;
        assert_eq!(outcome, BootstrapOutcome::Redirect {
            target: RedirectTarget::Onboarding,
            path: "/setup".into(),
        });
        assert_eq!(calls.list(), ["profile:u1"]);
    }

    #[tokio::test]
    async fn full_run_populates_slices_in_order() {
        let fake = Fake {
            hosted: Some(env_openrouter()),
            workspaces: Ok(vec![
                ws("w1", Some("img/1")),
                ws("w2", None),
                ws("w3", Some("img/3")),
                ws("w4", Some("img/unresolvable")),
            ]),
            image_urls: HashMap::from([
                ("img/1".to_string(), "http://cdn/1".to_string()),
                ("img/3".to_string(), "http://cdn/3".to_string()),
            ]),
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, true);
        let state = SharedState::new();
        let outcome = b.run(Some(&Session::new("u1")), &state).await;
        assert_eq!(outcome, BootstrapOutcome::Ready);

        assert_eq!(calls.list(), [
            "profile:u1",
            "hosted",
            "marketplace",
            "local",
            "workspaces:u1",
            "resolve:img/1",
            "fetch:http://cdn/1",
            "resolve:img/3",
            "fetch:http://cdn/3",
            "resolve:img/unresolvable",
        ]);

        let snap = state.snapshot();
        assert_eq!(snap.profile.unwrap().username, "ada");
        assert_eq!(snap.provider_availability.len(), 2);
        assert_eq!(snap.hosted_models[0].id, "gpt-4o");
        assert_eq!(snap.marketplace_models[0].id, "marketplace-model");
        assert_eq!(snap.local_models[0].id, "local-model");
        assert_eq!(snap.workspaces.len(), 4);
        let image_ids: Vec<_> = snap
            .workspace_images
            .iter()
            .map(|i| i.workspace_id.as_str())
            .collect();
        assert_eq!(image_ids, ["w1", "w3"]);
        assert_eq!(snap.selected_workspace_id.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn marketplace_skipped_without_any_key() {
        let (b, calls, _) = bootstrapper(Fake::default(), false);
        let state = SharedState::new();
        b.run(Some(&Session::new("u1")), &state).await;
        assert!(!calls.list().iter().any(|c| c == "marketplace" || c == "local"));
    }

    #[tokio::test]
    async fn marketplace_enabled_by_profile_key() {
        let mut profile = onboarded_profile();
        profile
            .api_keys
            .insert(MARKETPLACE_PROVIDER.into(), Secret::new("or-key".into()));
        let fake = Fake {
            profile: Some(profile),
            hosted: None,
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, false);
        let state = SharedState::new();
        b.run(Some(&Session::new("u1")), &state).await;
        // Hosted failed, the profile key alone is enough.
        assert!(calls.list().iter().any(|c| c == "marketplace"));
        assert!(state.provider_availability().get().is_empty());
        assert_eq!(state.marketplace_models().get().len(), 1);
    }

    #[tokio::test]
    async fn user_supplied_marketplace_entry_does_not_count_as_environment() {
        let fake = Fake {
            hosted: Some(HostedResolution {
                availability: ProviderAvailabilityMap::from([(
                    MARKETPLACE_PROVIDER.to_string(),
                    CredentialSource::User,
                )]),
                models: Vec::new(),
            }),
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, false);
        b.run(Some(&Session::new("u1")), &SharedState::new()).await;
        assert!(!calls.list().iter().any(|c| c == "marketplace"));
    }

    #[tokio::test]
    async fn soft_failures_do_not_block_other_slices() {
        let fake = Fake {
            hosted: Some(env_openrouter()),
            marketplace_fails: true,
            workspaces: Ok(vec![ws("w1", Some("img/bad")), ws("w2", Some("img/ok"))]),
            image_urls: HashMap::from([
                ("img/bad".to_string(), "http://cdn/fail".to_string()),
                ("img/ok".to_string(), "http://cdn/ok".to_string()),
            ]),
            ..Default::default()
        };
        let (b, _, _) = bootstrapper(fake, false);
        let state = SharedState::new();
        assert_eq!(
            b.run(Some(&Session::new("u1")), &state).await,
            BootstrapOutcome::Ready
        );
        let snap = state.snapshot();
        assert!(snap.marketplace_models.is_empty());
        assert_eq!(snap.hosted_models.len(), 1);
        assert_eq!(snap.workspaces.len(), 2);
        assert_eq!(snap.workspace_images.len(), 1);
        assert_eq!(snap.workspace_images[0].workspace_id, "w2");
    }

    #[tokio::test]
    async fn local_failure_leaves_other_slices_populated() {
        let fake = Fake {
            hosted: Some(env_openrouter()),
            local_fails: true,
            workspaces: Ok(vec![ws("w1", Some("img/1"))]),
            image_urls: HashMap::from([("img/1".to_string(), "http://cdn/1".to_string())]),
            ..Default::default()
        };
        let (b, calls, _) = bootstrapper(fake, true);
        let state = SharedState::new();
        assert_eq!(
            b.run(Some(&Session::new("u1")), &state).await,
            BootstrapOutcome::Ready
        );
        assert!(calls.list().iter().any(|c| c == "local"));

        let snap = state.snapshot();
        assert!(snap.local_models.is_empty());
        assert_eq!(snap.hosted_models.len(), 1);
        assert_eq!(snap.marketplace_models.len(), 1);
        assert_eq!(snap.workspaces.len(), 1);
        assert_eq!(snap.workspace_images.len(), 1);
        assert_eq!(snap.selected_workspace_id.as_deref(), Some("w1"));
    }

    #[tokio::test]
    async fn workspace_listing_failure_degrades_to_empty() {
        let fake = Fake {
            hosted: Some(env_openrouter()),
            workspaces: Err(ServiceError::message("db down")),
            ..Default::default()
        };
        let (b, _, _) = bootstrapper(fake, false);
        let state = SharedState::new();
        assert_eq!(
            b.run(Some(&Session::new("u1")), &state).await,
            BootstrapOutcome::Ready
        );
        assert!(state.workspaces().get().is_empty());
        assert_eq!(state.hosted_models().get().len(), 1);
    }

    #[tokio::test]
    async fn images_become_visible_one_at_a_time() {
        let fake = Fake {
            workspaces: Ok(vec![ws("w1", Some("img/1")), ws("w2", Some("img/2"))]),
            image_urls: HashMap::from([
                ("img/1".to_string(), "http://cdn/1".to_string()),
                ("img/2".to_string(), "http://cdn/slow".to_string()),
            ]),
            slow_url: Some("http://cdn/slow".into()),
            ..Default::default()
        };
        let (b, _, gate) = bootstrapper(fake, false);
        let state = SharedState::new();
        let mut images = state.workspace_images().subscribe();

        let task = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { b.run(Some(&Session::new("u1")), &state).await })
        };

        // The first image shows up while the second fetch is still blocked.
        images.wait_for(|v| v.len() == 1).await.unwrap();
        assert!(!task.is_finished());
        assert_eq!(state.workspace_images().get()[0].workspace_id, "w1");

        gate.notify_one();
        assert_eq!(task.await.unwrap(), BootstrapOutcome::Ready);
        assert_eq!(state.workspace_images().get().len(), 2);
    }

    #[tokio::test]
    async fn newer_run_supersedes_in_flight_run() {
        let fake = Fake {
            workspaces: Ok(vec![ws("w1", Some("img/1")), ws("w2", Some("img/2"))]),
            image_urls: HashMap::from([
                ("img/1".to_string(), "http://cdn/slow".to_string()),
                ("img/2".to_string(), "http://cdn/2".to_string()),
            ]),
            slow_url: Some("http://cdn/slow".into()),
            ..Default::default()
        };
        let (b, _, gate) = bootstrapper(fake, false);
        let b = Arc::new(b);
        let state = SharedState::new();
        let mut workspaces = state.workspaces().subscribe();

        let stale = {
            let (b, state) = (Arc::clone(&b), Arc::clone(&state));
            tokio::spawn(async move { b.run(Some(&Session::new("u1")), &state).await })
        };
        workspaces.wait_for(|w| w.len() == 2).await.unwrap();

        // Logout while the first image fetch is pending.
        state.clear();
        gate.notify_one();
        assert_eq!(stale.await.unwrap(), BootstrapOutcome::Superseded);
        assert!(state.workspace_images().get().is_empty());
        assert!(state.workspaces().get().is_empty());
    }

    #[tokio::test]
    async fn repeated_runs_are_idempotent() {
        let fake = Fake {
            hosted: Some(env_openrouter()),
            workspaces: Ok(vec![ws("w1", Some("img/1")), ws("w2", Some("img/2"))]),
            image_urls: HashMap::from([
                ("img/1".to_string(), "http://cdn/1".to_string()),
                ("img/2".to_string(), "http://cdn/2".to_string()),
            ]),
            ..Default::default()
        };
        let (b, _, _) = bootstrapper(fake, true);
        let state = SharedState::new();
        let session = Session::new("u1");

        b.run(Some(&session), &state).await;
        let first = serde_json::to_value(state.snapshot()).unwrap();
        b.run(Some(&session), &state).await;
        let second = serde_json::to_value(state.snapshot()).unwrap();
        assert_eq!(first, second);
        assert_eq!(state.workspace_images().get().len(), 2);
    }
}
