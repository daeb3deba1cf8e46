//! Process settings loaded via OrthoConfig, and the server configuration
//! derived from them.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use actix_web::cookie::{Key, SameSite};
use chrono::Duration;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use tracing::warn;

use cogtrain::domain::energy::{DEFAULT_MAX_ENERGY, DEFAULT_RECOVERY_MINUTES};
use cogtrain::domain::{EnergyPolicy, EnergyPolicyError};
use cogtrain::outbound::memory::MemoryStore;
use cogtrain::outbound::persistence::{DbPool, PoolConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";
const DEFAULT_POOL_SIZE: u32 = 10;

/// Settings for the settlement server, read from CLI args, `COGTRAIN_*`
/// environment variables and config files.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "COGTRAIN")]
pub struct AppSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// Postgres URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub pool_size: Option<u32>,
    /// File holding the shared session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Mark the session cookie `Secure`.
    #[ortho_config(default = true)]
    pub cookie_secure: bool,
    /// Fall back to a random key when the key file is unreadable.
    #[ortho_config(default = false)]
    pub allow_ephemeral_key: bool,
    /// Energy capacity reached through regeneration.
    pub energy_max: Option<u32>,
    /// Minutes needed to regenerate one unit of energy.
    pub energy_recovery_minutes: Option<i64>,
}

/// Failures turning [`AppSettings`] into a [`ServerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// `COGTRAIN_BIND_ADDR` is not a socket address.
    #[error("invalid bind address {value:?}: {source}")]
    BindAddr {
        /// Raw setting.
        value: String,
        /// Parser failure.
        source: std::net::AddrParseError,
    },
    /// Session key file missing or unreadable.
    #[error("failed to read session key at {path}: {source}")]
    SessionKey {
        /// Configured key file.
        path: PathBuf,
        /// Read failure.
        source: std::io::Error,
    },
    /// Energy overrides that do not form a valid policy.
    #[error("invalid energy policy: {0}")]
    Energy(#[from] EnergyPolicyError),
}

impl AppSettings {
    /// Listen address, falling back to all interfaces on port 8080.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        raw.parse().map_err(|source| SettingsError::BindAddr {
            value: raw.to_owned(),
            source,
        })
    }

    /// Path of the session key file.
    pub fn session_key_file(&self) -> &Path {
        self.session_key_file
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_SESSION_KEY_FILE))
    }

    /// Energy policy built from the configured overrides.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Energy`] for a zero capacity or an interval
    /// outside the accepted range.
    pub fn energy_policy(&self) -> Result<EnergyPolicy, SettingsError> {
        let max = self.energy_max.unwrap_or(DEFAULT_MAX_ENERGY);
        let minutes = self
            .energy_recovery_minutes
            .unwrap_or(DEFAULT_RECOVERY_MINUTES);
        let interval = Duration::try_minutes(minutes).ok_or(if minutes > 0 {
            EnergyPolicyError::IntervalTooLong
        } else {
            EnergyPolicyError::NonPositiveInterval
        })?;
        Ok(EnergyPolicy::new(max, interval)?)
    }

    /// Pool configuration, when a database URL is set.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url.as_ref().map(|url| {
            PoolConfig::new(url.clone()).with_max_size(self.pool_size.unwrap_or(DEFAULT_POOL_SIZE))
        })
    }

    /// Load the session key, or mint a temporary one in debug builds and
    /// when explicitly allowed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::SessionKey`] when the file is unreadable and
    /// no fallback is permitted.
    pub fn session_key(&self) -> Result<Key, SettingsError> {
        let path = self.session_key_file();
        match std::fs::read(path) {
            Ok(bytes) => Ok(Key::derive_from(&bytes)),
            Err(source) if cfg!(debug_assertions) || self.allow_ephemeral_key => {
                warn!(path = %path.display(), error = %source, "using temporary session key (dev only)");
                Ok(Key::generate())
            }
            Err(source) => Err(SettingsError::SessionKey {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

/// Storage backing the driven ports.
#[derive(Clone)]
pub enum StoreBackend {
    /// Diesel over a pooled Postgres connection.
    Postgres(DbPool),
    /// In-process fixtures; nothing survives a restart.
    Memory(Arc<MemoryStore>),
}

/// Builder-style configuration for creating the HTTP server.
pub struct ServerConfig {
    pub(crate) key: Key,
    pub(crate) cookie_secure: bool,
    pub(crate) same_site: SameSite,
    pub(crate) bind_addr: SocketAddr,
    pub(crate) policy: EnergyPolicy,
    pub(crate) store: StoreBackend,
}

impl ServerConfig {
    /// Construct a server configuration backed by a fresh in-memory store.
    #[must_use]
    pub fn new(key: Key, cookie_secure: bool, same_site: SameSite, bind_addr: SocketAddr) -> Self {
        Self {
            key,
            cookie_secure,
            same_site,
            bind_addr,
            policy: EnergyPolicy::default(),
            store: StoreBackend::Memory(Arc::new(MemoryStore::new())),
        }
    }

    /// Attach a database connection pool for the Diesel adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.store = StoreBackend::Postgres(pool);
        self
    }

    /// Replace the energy policy applied by settlement and progress reads.
    #[must_use]
    pub fn with_energy_policy(mut self, policy: EnergyPolicy) -> Self {
        self.policy = policy;
        self
    }
}
