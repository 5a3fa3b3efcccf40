//! Access gate enforced at the network edge.
//!
//! Every inbound request is classified by path. Exempt paths pass through
//! untouched; protected paths must carry an `Authorization: Basic ...`
//! header whose credentials match the configured pair. The gate keeps no
//! state between requests.

pub mod credentials;
pub mod error;
pub mod gate;
pub mod matcher;
pub mod middleware;

pub use {
    credentials::{CredentialError, CredentialVerifier},
    error::{Error, Result},
    gate::{AccessGate, Decision},
    matcher::{ExemptionSet, PathClass, PathMatcher},
    middleware::enforce_access_gate,
};
