//! Gateway: HTTP server with the access gate layered over every route and
//! the session endpoints that drive the bootstrap.
//!
//! Lifecycle:
//! 1. Load config (file, then environment overrides)
//! 2. Build the access gate and the bootstrap services
//! 3. Start the HTTP server; every request passes the gate first
//! 4. `POST /session` starts a bootstrap run in the background

pub mod server;
pub mod session;

pub use {
    server::{AppState, build_gateway_app, start_gateway},
    session::{RunStatus, SessionHub},
};
