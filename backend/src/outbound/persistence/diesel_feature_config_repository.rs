//! PostgreSQL-backed `FeatureConfigRepository`.
//!
//! The `feature_config` table is owned by operators; this adapter only reads
//! it.

use std::collections::BTreeMap;

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use serde_json::Value;

use crate::domain::ports::{FeatureConfigRepository, FeatureConfigRepositoryError};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::FeatureConfigRow;
use super::pool::{DbPool, PoolError};
use super::schema::feature_config;

/// Diesel-backed implementation of the feature configuration port.
#[derive(Clone)]
pub struct DieselFeatureConfigRepository {
    pool: DbPool,
}

impl DieselFeatureConfigRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> FeatureConfigRepositoryError {
    map_basic_pool_error(error, FeatureConfigRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> FeatureConfigRepositoryError {
    map_basic_diesel_error(
        error,
        FeatureConfigRepositoryError::query,
        FeatureConfigRepositoryError::connection,
    )
}

/// Escape `LIKE` metacharacters so the prefix matches literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for ch in prefix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl FeatureConfigRepository for DieselFeatureConfigRepository {
    async fn load_prefixed(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, Value>, FeatureConfigRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<FeatureConfigRow> = feature_config::table
            .filter(feature_config::key.like(like_prefix(prefix)))
            .select(FeatureConfigRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows
            .into_iter()
            .filter(|row| row.key.starts_with(prefix))
            .map(|row| (row.key, row.value))
            .collect())
    }
}
