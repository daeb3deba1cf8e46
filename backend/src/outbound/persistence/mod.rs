//! PostgreSQL persistence adapters using Diesel with `diesel-async` and a
//! `bb8` pool.
//!
//! Repositories only translate between row structs and domain types; the
//! settlement decision itself lives in the domain and runs inside the
//! adapter's transaction. Row structs (`models.rs`) and the schema
//! (`schema.rs`) stay private to this module.
//!
//! # Example
//!
//! ```ignore
//! use cogtrain::outbound::persistence::{DbPool, DieselSettlementRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/cogtrain")).await?;
//! let repo = DieselSettlementRepository::new(pool);
//! ```

mod diesel_basic_error_mapping;
mod diesel_feature_config_repository;
mod diesel_leaderboard_repository;
mod diesel_progress_repository;
mod diesel_settlement_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_feature_config_repository::DieselFeatureConfigRepository;
pub use diesel_leaderboard_repository::DieselLeaderboardRepository;
pub use diesel_progress_repository::DieselProgressRepository;
pub use diesel_settlement_repository::DieselSettlementRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
