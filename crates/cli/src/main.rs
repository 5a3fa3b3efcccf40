use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    clap::{Parser, Subcommand},
    gatehouse_bootstrap::{BootstrapOptions, Bootstrapper, InMemoryStore, Session, SharedState},
    gatehouse_config::GatehouseConfig,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "gatehouse", about = "Gatehouse: basic-auth gateway and session bootstrap")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Address to bind to (overrides config value).
    #[arg(long, global = true)]
    bind: Option<String>,
    /// Port to listen on (overrides config value).
    #[arg(long, global = true)]
    port: Option<u16>,
    /// Explicit config file (skips discovery).
    #[arg(long, global = true, env = "GATEHOUSE_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server (default when no subcommand is provided).
    Gateway {
        /// JSON fixture with profiles and workspaces to serve.
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Run one bootstrap pass and print the result as JSON.
    Bootstrap {
        /// JSON fixture with profiles and workspaces.
        #[arg(long)]
        fixture: PathBuf,
        /// Session subject; omit to bootstrap without a session.
        #[arg(long)]
        subject: Option<String>,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so `bootstrap` output stays parseable.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<GatehouseConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            let mut config = gatehouse_config::load_config(path)?;
            gatehouse_config::apply_env_overrides(&mut config);
            config
        },
        None => gatehouse_config::discover_and_load(),
    };
    if let Some(ref bind) = cli.bind {
        config.server.bind = bind.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    Ok(config)
}

fn load_store(fixture: Option<&Path>) -> anyhow::Result<Arc<InMemoryStore>> {
    let store = match fixture {
        Some(path) => InMemoryStore::load(path)?,
        None => {
            warn!("no fixture given; every session will redirect to login");
            InMemoryStore::new()
        },
    };
    Ok(Arc::new(store))
}

async fn run_bootstrap(
    config: &GatehouseConfig,
    fixture: &Path,
    subject: Option<String>,
) -> anyhow::Result<()> {
    let store = load_store(Some(fixture))?;
    let services = gatehouse_providers::live_services(config, store.clone(), store)?;
    let bootstrapper = Bootstrapper::new(services, BootstrapOptions::from_config(config));

    let state = SharedState::new();
    let session = subject.map(Session::new);
    let outcome = bootstrapper.run(session.as_ref(), &state).await;

    let report = serde_json::json!({
        "outcome": outcome,
        "state": state.snapshot(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "gatehouse starting");

    let config = load_config(&cli)?;

    match cli.command {
        None => gatehouse_gateway::start_gateway(config, load_store(None)?).await,
        Some(Commands::Gateway { ref fixture }) => {
            gatehouse_gateway::start_gateway(config, load_store(fixture.as_deref())?).await
        },
        Some(Commands::Bootstrap {
            ref fixture,
            ref subject,
        }) => run_bootstrap(&config, fixture, subject.clone()).await,
    }
}
