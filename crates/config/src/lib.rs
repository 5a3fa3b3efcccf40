//! Configuration loading, env substitution, and environment overrides.
//!
//! Config files: `gatehouse.toml` or `gatehouse.json`
//! Searched in `./` then `~/.config/gatehouse/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values. Environment
//! variables (`BASIC_AUTH_USER`, `OLLAMA_URL`, provider API keys, ...) are
//! applied last and win over file values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        BootstrapConfig, GateConfig, GatehouseConfig, ImageFetchConfig, LocalProviderConfig,
        MarketplaceProviderConfig, PathMatcherConfig, ProvidersConfig, ServerConfig,
    },
};
