use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::gate::{AccessGate, Decision};

/// Middleware enforcing the access gate on every request.
///
/// Allowed requests are forwarded unchanged. Denied requests get a 401 with
/// a `WWW-Authenticate` challenge and an empty body.
pub async fn enforce_access_gate(
    State(gate): State<Arc<AccessGate>>,
    request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match gate.decide(request.uri().path(), authorization) {
        Decision::Allow => next.run(request).await,
        Decision::Deny => deny(&gate),
    }
}

fn deny(gate: &AccessGate) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, gate.challenge().clone())],
        Body::empty(),
    )
        .into_response()
}
