//! PostgreSQL-backed `ProgressRepository`. Plain reads, no row locks.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::ports::{AccountProgress, ProgressRepository, ProgressRepositoryError};
use crate::domain::unlocks::normalize_unlock_state;
use crate::domain::{AccountAggregate, AccountId, GameMode};

use super::diesel_basic_error_mapping::{map_basic_diesel_error, map_basic_pool_error};
use super::models::{AccountRow, UnlockStateRow};
use super::pool::{DbPool, PoolError};
use super::schema::{accounts, unlock_states};

/// Diesel-backed implementation of the progress port.
#[derive(Clone)]
pub struct DieselProgressRepository {
    pool: DbPool,
}

impl DieselProgressRepository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> ProgressRepositoryError {
    map_basic_pool_error(error, ProgressRepositoryError::connection)
}

fn map_diesel_error(error: diesel::result::Error) -> ProgressRepositoryError {
    map_basic_diesel_error(
        error,
        ProgressRepositoryError::query,
        ProgressRepositoryError::connection,
    )
}

#[async_trait]
impl ProgressRepository for DieselProgressRepository {
    async fn load_progress(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountProgress>, ProgressRepositoryError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let Some(row) = accounts::table
            .filter(accounts::id.eq(account_id.as_uuid()))
            .select(AccountRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?
        else {
            return Ok(None);
        };

        let rows: Vec<UnlockStateRow> = unlock_states::table
            .filter(unlock_states::account_id.eq(account_id.as_uuid()))
            .select(UnlockStateRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        let unlocks = rows
            .into_iter()
            .filter_map(|row| match row.mode.parse::<GameMode>() {
                Ok(mode) => Some(normalize_unlock_state(mode, Some(&row.state))),
                Err(_) => {
                    debug!(%account_id, mode = %row.mode, "skipping unknown unlock mode");
                    None
                }
            })
            .collect();

        Ok(Some(AccountProgress {
            account: AccountAggregate::from(row),
            unlocks,
        }))
    }
}
