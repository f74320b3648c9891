//! oven-server: HTTP front end for the simulated microwave
//!
//! - Issues signed tokens on login and checks them on every appliance call
//! - Keeps one oven per browser session, advanced lazily on each request
//! - Serves the heating program catalog from a JSON file

mod error;
mod handlers;
mod middleware;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use oven_core::{AuthService, Config, MemoryStateStore, ProgramCatalog};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "oven_server=debug,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });
    config.apply_env().context("invalid environment override")?;

    // Initialize token signing
    let secret = match config.auth.secret_bytes()? {
        Some(secret) => secret,
        None => {
            tracing::info!("Generated random token secret (will change on restart)");
            oven_core::token::generate_secret().to_vec()
        }
    };

    if config.auth.users.is_empty() {
        tracing::warn!("No users configured, enabling the stock admin and user accounts");
        for user in oven_core::auth::stock_users()? {
            config.auth.upsert_user(user);
        }
    }

    let auth = AuthService::new(&config.auth.users, &secret, config.auth.token_ttl);
    tracing::info!("{} users loaded, tokens valid for {}s", auth.user_count(), auth.token_ttl());

    // Program catalog
    let catalog = ProgramCatalog::new(config.server.programs_path.clone());
    catalog
        .seed_defaults()
        .with_context(|| format!("cannot seed {}", config.server.programs_path.display()))?;
    tracing::info!("Program catalog: {}", catalog.path().display());

    let store = Arc::new(MemoryStateStore::new(config.server.session_idle_ttl));
    let state = Arc::new(AppState::new(auth, catalog, store));

    let app = routes::router(state);

    // Start server
    let addr = SocketAddr::from((
        config.server.listen_addr.parse::<std::net::IpAddr>()?,
        config.server.port,
    ));
    tracing::info!("oven-server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
