use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::State,
        http::StatusCode,
        response::{Html, IntoResponse, Json},
        routing::{get, post},
    },
    gatehouse_bootstrap::{
        BootstrapOptions, Bootstrapper, InMemoryStore, Session, services::BootstrapServices,
    },
    gatehouse_config::GatehouseConfig,
    gatehouse_gate::{AccessGate, enforce_access_gate},
    serde::Deserialize,
    tower_http::{
        cors::{Any, CorsLayer},
        trace::TraceLayer,
    },
    tracing::{info, warn},
};

use crate::session::SessionHub;

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<SessionHub>,
}

// ── Server startup ───────────────────────────────────────────────────────────

/// Build the gateway router (shared between production startup and tests).
///
/// The gate wraps every route, including the fallback, so unknown paths are
/// classified the same way as known ones.
pub fn build_gateway_app(gate: Arc<AccessGate>, hub: Arc<SessionHub>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(app_shell_handler))
        .route("/login", get(login_handler))
        .route("/api/health", get(health_handler))
        // Session routes stay outside the exempt `/api/` namespace so the
        // gate checks them like the app shell.
        .route(
            "/session",
            post(start_session_handler).delete(end_session_handler),
        )
        .route("/state", get(state_handler))
        .route("/state/selected-workspace", post(select_workspace_handler))
        .fallback(not_found_handler)
        .with_state(AppState { hub })
        .layer(axum::middleware::from_fn_with_state(gate, enforce_access_gate))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
pub async fn start_gateway(config: GatehouseConfig, store: Arc<InMemoryStore>) -> anyhow::Result<()> {
    let blank = config.gate.blank_credentials();
    if !blank.is_empty() {
        warn!(
            "gate {} is blank; protected paths admit only the configured pair, blank parts included",
            blank.join(" and ")
        );
    }
    let gate = Arc::new(AccessGate::from_config(&config.gate)?);

    let services = gatehouse_providers::live_services(&config, store.clone(), store)?;
    let hub = session_hub(services, &config);

    let app = build_gateway_app(gate, hub);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        %addr,
        local_models = config.providers.local.enabled,
        "gatehouse gateway listening"
    );
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

pub fn session_hub(services: BootstrapServices, config: &GatehouseConfig) -> Arc<SessionHub> {
    SessionHub::new(Bootstrapper::new(
        services,
        BootstrapOptions::from_config(config),
    ))
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn login_handler() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

#[derive(Debug, Default, Deserialize)]
struct StartSession {
    subject: Option<String>,
}

async fn start_session_handler(
    State(state): State<AppState>,
    body: Option<Json<StartSession>>,
) -> impl IntoResponse {
    let session = body
        .and_then(|Json(b)| b.subject)
        .filter(|s| !s.trim().is_empty())
        .map(Session::new);
    state.hub.start(session).await;
    StatusCode::ACCEPTED
}

async fn end_session_handler(State(state): State<AppState>) -> impl IntoResponse {
    state.hub.logout().await;
    StatusCode::NO_CONTENT
}

async fn state_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.hub.view().await)
}

#[derive(Debug, Deserialize)]
struct SelectWorkspace {
    id: String,
}

async fn select_workspace_handler(
    State(state): State<AppState>,
    Json(body): Json<SelectWorkspace>,
) -> impl IntoResponse {
    if state.hub.state().select_workspace(&body.id) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn app_shell_handler(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.hub.view().await;
    Json(serde_json::json!({
        "app": "gatehouse",
        "run": view.status,
        "workspaces": view.state.workspaces.len(),
        "selectedWorkspaceId": view.state.selected_workspace_id,
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    StatusCode::NOT_FOUND
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>Sign in</title></head>
<body>
<form id="login">
  <label>Subject <input name="subject" autocomplete="username"></label>
  <button type="submit">Continue</button>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (e) => {
  e.preventDefault();
  const subject = new FormData(e.target).get("subject");
  await fetch("/session", {
    method: "POST",
    headers: { "content-type": "application/json" },
    body: JSON.stringify({ subject }),
  });
  location.href = "/";
});
</script>
</body>
</html>
"#;
