//! MERIDIAN — Investment Platform Back-Office Engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! connects the document store backend, and serves the admin dashboard
//! with graceful shutdown.

use anyhow::{bail, Result};
use std::sync::Arc;
use tracing::info;

use meridian::config::AppConfig;
use meridian::dashboard::{self, routes::DashboardState};
use meridian::store::{DocumentStore, Ledger, MemoryStore, RestStore};

const BANNER: &str = r#"
 __  __ _____ ____  ___ ____ ___    _    _   _
|  \/  | ____|  _ \|_ _|  _ \_ _|  / \  | \ | |
| |\/| |  _| | |_) || || | | | |  / _ \ |  \| |
| |  | | |___|  _ < | || |_| | | / ___ \| |\  |
|_|  |_|_____|_| \_\___|____/___/_/   \_\_| \_|

  Investment Platform Back-Office Engine
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let cfg = AppConfig::load("config.toml")?;

    // Initialise structured logging
    init_logging();

    // Print startup banner
    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        currency = %cfg.service.currency,
        backend = %cfg.store.backend,
        "MERIDIAN starting up"
    );

    // -- Connect the store backend ----------------------------------------

    let store: Arc<dyn DocumentStore> = match cfg.store.backend.as_str() {
        "rest" => {
            let api_key = AppConfig::resolve_env(&cfg.store.api_key_env)?;
            Arc::new(RestStore::new(
                &cfg.store.endpoint,
                &cfg.store.project_id,
                &api_key,
                &cfg.store.database_id,
            )?)
        }
        "memory" => {
            info!("Using in-memory store — data will not survive a restart");
            Arc::new(MemoryStore::new())
        }
        other => bail!("Unknown store backend: {other}"),
    };

    let ledger = Ledger::new(store);

    // -- Serve the dashboard -----------------------------------------------

    if cfg.dashboard.enabled {
        let state = Arc::new(DashboardState::new(&cfg.service.name, ledger));
        dashboard::spawn_dashboard(state, cfg.dashboard.port)?;
    } else {
        info!("Dashboard disabled in config");
    }

    info!("Ready. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. MERIDIAN shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("meridian=info"));

    let json_logging = std::env::var("MERIDIAN_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
