//! Credential verifier for `Authorization: <scheme> <base64(user:pass)>`.

use {
    base64::Engine,
    secrecy::{ExposeSecret, Secret},
};

/// Why a presented credential was rejected. Only used for logging; the
/// client always sees the same challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CredentialError {
    #[error("missing authorization header")]
    Missing,
    #[error("unexpected authorization scheme")]
    WrongScheme,
    #[error("malformed credential encoding")]
    Malformed,
    #[error("credentials do not match")]
    Mismatch,
}

/// Validates a presented credential pair against the configured one.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    scheme: String,
    username: Secret<String>,
    password: Secret<String>,
}

impl CredentialVerifier {
    pub fn new(scheme: impl Into<String>, username: Secret<String>, password: Secret<String>) -> Self {
        Self {
            scheme: scheme.into(),
            username,
            password,
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Check the raw `Authorization` header value, if any.
    pub fn verify(&self, header: Option<&str>) -> Result<(), CredentialError> {
        let header = header.ok_or(CredentialError::Missing)?.trim();

        let (scheme, encoded) = header
            .split_once(' ')
            .ok_or(CredentialError::Malformed)?;
        if !scheme.eq_ignore_ascii_case(&self.scheme) {
            return Err(CredentialError::WrongScheme);
        }

        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|_| CredentialError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| CredentialError::Malformed)?;

        // Passwords may contain ':'; usernames may not.
        let (user, pass) = decoded.split_once(':').ok_or(CredentialError::Malformed)?;

        // Evaluate both comparisons so a username mismatch costs the same as
        // a password mismatch.
        let user_ok = constant_time_eq(user.as_bytes(), self.username.expose_secret().as_bytes());
        let pass_ok = constant_time_eq(pass.as_bytes(), self.password.expose_secret().as_bytes());
        if user_ok & pass_ok {
            Ok(())
        } else {
            Err(CredentialError::Mismatch)
        }
    }
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Encode a `user:pass` pair the way a client would send it.
pub fn basic_header_value(username: &str, password: &str) -> String {
    let encoded =
        base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
    format!("Basic {encoded}")
}
