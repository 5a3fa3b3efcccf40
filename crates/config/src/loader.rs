use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::GatehouseConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["gatehouse.toml", "gatehouse.json"];

/// Environment variables carrying hosted-provider API keys.
pub const HOSTED_KEY_VARS: &[(&str, &str)] = &[
    ("openai", "OPENAI_API_KEY"),
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("google", "GOOGLE_GEMINI_API_KEY"),
    ("mistral", "MISTRAL_API_KEY"),
    ("groq", "GROQ_API_KEY"),
    ("perplexity", "PERPLEXITY_API_KEY"),
    ("openrouter", "OPENROUTER_API_KEY"),
];

/// Load config from the given path (TOML or JSON).
pub fn load_config(path: &Path) -> anyhow::Result<GatehouseConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations, then apply
/// environment overrides.
///
/// Search order:
/// 1. `./gatehouse.{toml,json}` (project-local)
/// 2. `~/.config/gatehouse/gatehouse.{toml,json}` (user-global)
///
/// Falls back to `GatehouseConfig::default()` if no file is found or the
/// file fails to parse.
pub fn discover_and_load() -> GatehouseConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                GatehouseConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        GatehouseConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

/// Apply process environment overrides on top of file values.
pub fn apply_env_overrides(config: &mut GatehouseConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

/// Same as [`apply_env_overrides`] but with a custom lookup, so tests don't
/// have to mutate the process environment.
pub fn apply_env_overrides_with(
    config: &mut GatehouseConfig,
    lookup: impl Fn(&str) -> Option<String>,
) {
    if let Some(user) = lookup("BASIC_AUTH_USER") {
        config.gate.username = Secret::new(user);
    }
    if let Some(password) = lookup("BASIC_AUTH_PASSWORD") {
        config.gate.password = Secret::new(password);
    }

    if let Some(url) = lookup("OLLAMA_URL").filter(|u| !u.trim().is_empty()) {
        config.providers.local.base_url = url.trim().to_string();
        config.providers.local.enabled = true;
    }
    if let Some(flag) = lookup("GATEHOUSE_LOCAL_MODELS") {
        match parse_bool(&flag) {
            Some(enabled) => config.providers.local.enabled = enabled,
            None => warn!(value = %flag, "ignoring unparseable GATEHOUSE_LOCAL_MODELS"),
        }
    }

    for (provider, var) in HOSTED_KEY_VARS {
        if let Some(key) = lookup(var).filter(|k| !k.trim().is_empty()) {
            config
                .providers
                .hosted_env_keys
                .insert((*provider).to_string(), Secret::new(key));
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Returns the user-global config directory (`~/.config/gatehouse`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "gatehouse").map(|d| d.config_dir().to_path_buf())
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    if let Some(dir) = config_dir() {
        for name in CONFIG_FILENAMES {
            let p = dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<GatehouseConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
