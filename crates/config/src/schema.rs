/// Config schema types (server, access gate, bootstrap, providers).
use std::collections::BTreeMap;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub server: ServerConfig,
    pub gate: GateConfig,
    pub bootstrap: BootstrapConfig,
    pub providers: ProvidersConfig,
}

/// Gateway server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "127.0.0.1".
    pub bind: String,
    /// Port to listen on. Defaults to 3000.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Access gate configuration: expected credentials and the exemption list.
///
/// Unset credentials are empty strings, which means the gate admits any
/// client submitting a blank `user:pass` pair. This is reported as a warning
/// at startup, not treated as an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    #[serde(serialize_with = "serialize_secret")]
    pub username: Secret<String>,
    #[serde(serialize_with = "serialize_secret")]
    pub password: Secret<String>,
    /// Authorization scheme expected in the `Authorization` header.
    pub scheme: String,
    /// Realm advertised in the `WWW-Authenticate` challenge.
    pub realm: String,
    /// Paths matching any of these bypass the credential check.
    pub exemptions: Vec<PathMatcherConfig>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            username: Secret::new(String::new()),
            password: Secret::new(String::new()),
            scheme: "Basic".into(),
            realm: "Secure Area".into(),
            exemptions: default_exemptions(),
        }
    }
}

impl GateConfig {
    /// Names of the expected credentials that are empty.
    pub fn blank_credentials(&self) -> Vec<&'static str> {
        let mut blank = Vec::new();
        if self.username.expose_secret().is_empty() {
            blank.push("username");
        }
        if self.password.expose_secret().is_empty() {
            blank.push("password");
        }
        blank
    }

    /// True when either expected credential is empty.
    pub fn has_blank_credentials(&self) -> bool {
        !self.blank_credentials().is_empty()
    }
}

/// One entry in the gate's exemption list.
///
/// In TOML: `{ kind = "prefix", value = "/api" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PathMatcherConfig {
    Exact(String),
    Prefix(String),
    Suffix(String),
    /// Regular expression matched against the whole request path.
    Pattern(String),
}

/// Built-in exemptions: framework assets, API routes, SEO/PWA files,
/// localized manifests and the login entry point.
pub fn default_exemptions() -> Vec<PathMatcherConfig> {
    use PathMatcherConfig::*;
    vec![
        Prefix("/_next/".into()),
        Prefix("/assets/".into()),
        Prefix("/api/".into()),
        Exact("/api".into()),
        Exact("/favicon.ico".into()),
        Exact("/robots.txt".into()),
        Exact("/sitemap.xml".into()),
        Exact("/manifest.json".into()),
        Suffix(".webmanifest".into()),
        Pattern(r"^/[a-z]{2}/manifest(\.json|\.webmanifest)?$".into()),
        Exact("/login".into()),
        Prefix("/login/".into()),
    ]
}

/// Navigation targets used by the session bootstrap.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    pub login_path: String,
    pub onboarding_path: String,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            login_path: "/login".into(),
            onboarding_path: "/setup".into(),
        }
    }
}

/// Model provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Operator-supplied API keys, keyed by provider name (e.g. "openai").
    #[serde(serialize_with = "serialize_secret_map")]
    pub hosted_env_keys: BTreeMap<String, Secret<String>>,
    pub local: LocalProviderConfig,
    pub marketplace: MarketplaceProviderConfig,
    pub images: ImageFetchConfig,
}

impl ProvidersConfig {
    /// True when the environment supplies a non-empty key for `provider`.
    pub fn has_env_key(&self, provider: &str) -> bool {
        self.hosted_env_keys
            .get(provider)
            .is_some_and(|key| !key.expose_secret().trim().is_empty())
    }
}

/// Local model server (Ollama) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalProviderConfig {
    /// Feature flag: when false, local models are never queried.
    pub enabled: bool,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LocalProviderConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:11434".into(),
            timeout_secs: 2,
        }
    }
}

/// Marketplace catalog (OpenRouter) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplaceProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MarketplaceProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://openrouter.ai/api/v1".into(),
            timeout_secs: 10,
        }
    }
}

/// Workspace image downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageFetchConfig {
    /// Per-image request timeout.
    pub timeout_secs: u64,
}

impl Default for ImageFetchConfig {
    fn default() -> Self {
        Self { timeout_secs: 10 }
    }
}

// ── Serde helpers for Secret<String> ────────────────────────────────────────

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_secret_map<S: serde::Serializer>(
    secrets: &BTreeMap<String, Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(secrets.len()))?;
    for (name, secret) in secrets {
        map.serialize_entry(name, secret.expose_secret())?;
    }
    map.end()
}
