//! Integration tests for the session endpoints driving the bootstrap.

#![allow(clippy::unwrap_used)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use {
    gatehouse_bootstrap::{BootstrapServices, InMemoryStore},
    gatehouse_config::GatehouseConfig,
    gatehouse_gate::AccessGate,
    gatehouse_gateway::{build_gateway_app, server::session_hub},
    reqwest::{Client, RequestBuilder, StatusCode},
    secrecy::Secret,
    serde_json::{Value, json},
    tokio::net::TcpListener,
};

const FIXTURE: &str = r#"{
  "profiles": [
    { "subject": "u1", "username": "ada", "hasOnboarded": true },
    { "subject": "new", "hasOnboarded": false }
  ],
  "workspaces": {
    "u1": [
      { "id": "w1", "name": "Research" },
      { "id": "w2", "name": "Home", "isHome": true }
    ]
  }
}"#;

const USER: &str = "admin";
const PASSWORD: &str = "hunter2";

/// Every session route sits behind the gate.
fn authed(builder: RequestBuilder) -> RequestBuilder {
    builder.basic_auth(USER, Some(PASSWORD))
}

async fn start_server() -> SocketAddr {
    let store = Arc::new(InMemoryStore::from_json(FIXTURE).unwrap());
    let services = BootstrapServices::noop()
        .with_profiles(store.clone())
        .with_workspaces(store);
    let mut config = GatehouseConfig::default();
    config.gate.username = Secret::new(USER.into());
    config.gate.password = Secret::new(PASSWORD.into());
    let gate = Arc::new(AccessGate::from_config(&config.gate).unwrap());
    let app = build_gateway_app(gate, session_hub(services, &config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });
    addr
}

/// Poll `/state` until the run leaves `running`.
async fn settled_state(addr: SocketAddr) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let body: Value = authed(Client::new().get(format!("http://{addr}/state")))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap();
            if body["status"] != "running" {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap()
}

async fn start_session(addr: SocketAddr, body: Value) -> StatusCode {
    authed(Client::new().post(format!("http://{addr}/session")))
        .json(&body)
        .send()
        .await
        .unwrap()
        .status()
}

#[tokio::test]
async fn state_is_idle_before_any_session() {
    let addr = start_server().await;
    let body = settled_state(addr).await;
    assert_eq!(body["status"], "idle");
    assert!(body["state"]["profile"].is_null());
}

#[tokio::test]
async fn onboarded_session_bootstraps_to_ready() {
    let addr = start_server().await;
    assert_eq!(start_session(addr, json!({ "subject": "u1" })).await, 202);

    let body = settled_state(addr).await;
    assert_eq!(body["status"], "ready");
    let state = &body["state"];
    assert_eq!(state["profile"]["username"], "ada");
    assert_eq!(state["workspaces"].as_array().unwrap().len(), 2);
    assert_eq!(state["selectedWorkspaceId"], "w2");
    // Keys never leave the server.
    assert!(state["profile"].get("apiKeys").is_none());
}

#[tokio::test]
async fn unknown_subject_redirects_to_login() {
    let addr = start_server().await;
    start_session(addr, json!({ "subject": "ghost" })).await;
    let body = settled_state(addr).await;
    assert_eq!(body["status"], "redirect");
    assert_eq!(body["target"], "login");
    assert_eq!(body["path"], "/login");
}

#[tokio::test]
async fn blank_subject_counts_as_no_session() {
    let addr = start_server().await;
    start_session(addr, json!({ "subject": "  " })).await;
    let body = settled_state(addr).await;
    assert_eq!(body["target"], "login");
}

#[tokio::test]
async fn not_onboarded_redirects_to_setup() {
    let addr = start_server().await;
    start_session(addr, json!({ "subject": "new" })).await;
    let body = settled_state(addr).await;
    assert_eq!(body["status"], "redirect");
    assert_eq!(body["target"], "onboarding");
    assert_eq!(body["path"], "/setup");
    // The profile was already loaded before the onboarding check.
    assert_eq!(body["state"]["profile"]["subject"], "new");
}

#[tokio::test]
async fn workspace_selection_and_logout() {
    let addr = start_server().await;
    let client = Client::new();
    start_session(addr, json!({ "subject": "u1" })).await;
    settled_state(addr).await;

    let resp = authed(client.post(format!("http://{addr}/state/selected-workspace")))
        .json(&json!({ "id": "w1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(settled_state(addr).await["state"]["selectedWorkspaceId"], "w1");

    let resp = authed(client.post(format!("http://{addr}/state/selected-workspace")))
        .json(&json!({ "id": "nope" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = authed(client.delete(format!("http://{addr}/session")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let body = settled_state(addr).await;
    assert_eq!(body["status"], "idle");
    assert!(body["state"]["workspaces"].as_array().unwrap().is_empty());
    assert!(body["state"]["selectedWorkspaceId"].is_null());
}

/// A second session replaces the first one's results.
#[tokio::test]
async fn new_session_supersedes_previous() {
    let addr = start_server().await;
    start_session(addr, json!({ "subject": "u1" })).await;
    settled_state(addr).await;

    start_session(addr, json!({ "subject": "new" })).await;
    let body = settled_state(addr).await;
    assert_eq!(body["target"], "onboarding");
    assert!(body["state"]["workspaces"].as_array().unwrap().is_empty());
}
