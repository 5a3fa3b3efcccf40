use {axum::http::HeaderValue, gatehouse_config::GateConfig, tracing::debug};

use crate::{
    credentials::CredentialVerifier,
    error::{Context, Result},
    matcher::{ExemptionSet, PathClass},
};

/// Per-request verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Path classifier plus credential verifier. Stateless: `decide` depends only
/// on its arguments and the immutable configuration.
#[derive(Debug, Clone)]
pub struct AccessGate {
    exemptions: ExemptionSet,
    verifier: CredentialVerifier,
    challenge: HeaderValue,
}

impl AccessGate {
    pub fn new(exemptions: ExemptionSet, verifier: CredentialVerifier, realm: &str) -> Result<Self> {
        let challenge = HeaderValue::from_str(&format!(
            "{} realm=\"{}\"",
            verifier.scheme(),
            realm.replace('"', "")
        ))
        .context("invalid realm for WWW-Authenticate header")?;
        Ok(Self {
            exemptions,
            verifier,
            challenge,
        })
    }

    pub fn from_config(cfg: &GateConfig) -> Result<Self> {
        let exemptions = ExemptionSet::from_config(&cfg.exemptions)?;
        let verifier =
            CredentialVerifier::new(cfg.scheme.clone(), cfg.username.clone(), cfg.password.clone());
        Self::new(exemptions, verifier, &cfg.realm)
    }

    /// Decide whether a request for `path` carrying `authorization` may pass.
    pub fn decide(&self, path: &str, authorization: Option<&str>) -> Decision {
        if self.exemptions.classify(path) == PathClass::Exempt {
            return Decision::Allow;
        }
        match self.verifier.verify(authorization) {
            Ok(()) => Decision::Allow,
            Err(reason) => {
                debug!(path, %reason, "access gate denied request");
                Decision::Deny
            },
        }
    }

    /// Value for the `WWW-Authenticate` header on a denial.
    pub fn challenge(&self) -> &HeaderValue {
        &self.challenge
    }
}
