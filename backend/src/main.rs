//! Settlement server entry-point: loads settings, prepares storage and
//! serves the REST API.

mod server;

use actix_web::cookie::SameSite;
use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use cogtrain::inbound::http::health::HealthState;
use cogtrain::outbound::persistence::{DbPool, run_migrations};
use server::{AppSettings, ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|err| std::io::Error::other(err.to_string()))?;
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;
    let key = settings.session_key().map_err(std::io::Error::other)?;
    let policy = settings.energy_policy().map_err(std::io::Error::other)?;

    let mut config = ServerConfig::new(key, settings.cookie_secure, SameSite::Lax, bind_addr)
        .with_energy_policy(policy);

    match settings.pool_config() {
        Some(pool_config) => {
            let applied = run_migrations(pool_config.database_url())
                .await
                .map_err(std::io::Error::other)?;
            let pool = DbPool::new(pool_config)
                .await
                .map_err(std::io::Error::other)?;
            info!(applied, "using postgres store");
            config = config.with_db_pool(pool);
        }
        None => warn!("no database configured; using the in-memory store"),
    }

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting settlement server");
    create_server(health_state, config)?.await
}
