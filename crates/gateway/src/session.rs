//! Owns the shared state and the single in-flight bootstrap task.

use std::sync::Arc;

use {
    gatehouse_bootstrap::{
        BootstrapOutcome, Bootstrapper, RedirectTarget, Session, SharedState, StateSnapshot,
    },
    serde::Serialize,
    tokio::{sync::Mutex, task::JoinHandle},
    tracing::{debug, info},
};

/// Progress of the most recent bootstrap, as reported by `GET /state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Running,
    Ready,
    Redirect { target: RedirectTarget, path: String },
}

impl From<BootstrapOutcome> for RunStatus {
    fn from(outcome: BootstrapOutcome) -> Self {
        match outcome {
            BootstrapOutcome::Ready => Self::Ready,
            BootstrapOutcome::Redirect { target, path } => Self::Redirect { target, path },
            // Whoever superseded the run owns the status now.
            BootstrapOutcome::Superseded => Self::Running,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub status: RunStatus,
    pub state: StateSnapshot,
}

struct Inner {
    task: Option<JoinHandle<()>>,
    status: RunStatus,
}

pub struct SessionHub {
    state: Arc<SharedState>,
    bootstrapper: Arc<Bootstrapper>,
    inner: Mutex<Inner>,
}

impl SessionHub {
    pub fn new(bootstrapper: Bootstrapper) -> Arc<Self> {
        Arc::new(Self {
            state: SharedState::new(),
            bootstrapper: Arc::new(bootstrapper),
            inner: Mutex::new(Inner {
                task: None,
                status: RunStatus::Idle,
            }),
        })
    }

    pub fn state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub async fn status(&self) -> RunStatus {
        self.inner.lock().await.status.clone()
    }

    pub async fn view(&self) -> SessionView {
        let inner = self.inner.lock().await;
        SessionView {
            status: inner.status.clone(),
            state: self.state.snapshot(),
        }
    }

    /// Start a bootstrap for `session`, aborting whatever run is in flight.
    pub async fn start(self: &Arc<Self>, session: Option<Session>) {
        let mut inner = self.inner.lock().await;
        let writer = self.state.begin_bootstrap();
        if let Some(previous) = inner.task.take() {
            previous.abort();
            debug!(generation = writer.generation(), "aborted previous bootstrap");
        }
        inner.status = RunStatus::Running;

        let hub = Arc::clone(self);
        inner.task = Some(tokio::spawn(async move {
            let outcome = hub.bootstrapper.run_with(session.as_ref(), &writer).await;
            let mut inner = hub.inner.lock().await;
            // Generation bumps happen under this lock, so the check is stable.
            if writer.is_current() {
                info!(?outcome, "bootstrap finished");
                inner.status = outcome.into();
                inner.task = None;
            }
        }));
    }

    /// Logout: stop the run and drop every slice.
    pub async fn logout(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        self.state.clear();
        inner.status = RunStatus::Idle;
        info!("session cleared");
    }
}
