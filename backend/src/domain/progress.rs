//! Progress read model.
//!
//! Energy recovery is applied on read and never persisted here; only
//! settlement moves the stored recovery anchor.

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;

use crate::domain::ports::{
    ProgressQuery, ProgressRepository, ProgressRepositoryError, ProgressView,
};
use crate::domain::unlocks::UnlockTrees;
use crate::domain::{AccountId, EnergyPolicy, Error};

fn map_repository_error(error: ProgressRepositoryError) -> Error {
    match error {
        ProgressRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("progress repository unavailable: {message}"))
        }
        ProgressRepositoryError::Query { message } => {
            Error::internal(format!("progress repository error: {message}"))
        }
    }
}

/// Progress service implementing the progress driving port.
#[derive(Clone)]
pub struct ProgressService<R> {
    progress_repo: Arc<R>,
    policy: EnergyPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> ProgressService<R> {
    /// Build the service over its repository, policy and clock.
    pub fn new(progress_repo: Arc<R>, policy: EnergyPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            progress_repo,
            policy,
            clock,
        }
    }
}

#[async_trait]
impl<R> ProgressQuery for ProgressService<R>
where
    R: ProgressRepository,
{
    async fn progress(&self, account_id: &AccountId) -> Result<ProgressView, Error> {
        let progress = self
            .progress_repo
            .load_progress(account_id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| Error::account_not_found(format!("account {account_id} not found")))?;

        let account = progress.account;
        Ok(ProgressView {
            rank_level: account.rank_level(),
            energy: self.policy.read(&account.energy, self.clock.utc()),
            unlocks: UnlockTrees::from_states(progress.unlocks),
            account_id: account.id,
            display_name: account.display_name,
            xp: account.xp,
            currency: account.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for the progress read model.
    use super::*;
    use chrono::{DateTime, Duration, Local, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use crate::domain::ports::{AccountProgress, MockProgressRepository};
    use crate::domain::unlocks::{NumericUnlocks, UnlockState};
    use crate::domain::{AccountAggregate, ErrorCode, GameConfig, GameMode, NumericConfig};

    struct FixtureClock {
        utc_now: DateTime<Utc>,
    }

    impl Clock for FixtureClock {
        fn local(&self) -> DateTime<Local> {
            self.utc_now.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.utc_now
        }
    }

    #[fixture]
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 10, 18, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn service(
        repo: MockProgressRepository,
        now: DateTime<Utc>,
    ) -> ProgressService<MockProgressRepository> {
        ProgressService::new(
            Arc::new(repo),
            EnergyPolicy::default(),
            Arc::new(FixtureClock { utc_now: now }),
        )
    }

    #[rstest]
    #[tokio::test]
    async fn energy_is_recovered_on_read(now: DateTime<Utc>) {
        let id = AccountId::random();
        let mut account = AccountAggregate::new(id.clone(), "Grace", 1);
        account.xp = 2_500;
        account.currency = 40;
        account.energy.updated_at = Some(now - Duration::minutes(65));
        let numeric = UnlockState::default_for(GameMode::Numeric);
        let (advanced, _) = numeric.advance(&GameConfig::Numeric(NumericConfig {
            depth: 1,
            rounds: 10,
        }));

        let mut repo = MockProgressRepository::new();
        let stored = AccountProgress {
            account,
            unlocks: vec![advanced],
        };
        repo.expect_load_progress()
            .times(1)
            .return_once(move |_| Ok(Some(stored)));

        let view = service(repo, now).progress(&id).await.expect("progress read");

        assert_eq!(view.energy.current, 3);
        assert_eq!(
            view.energy.next_unit_at,
            Some(now - Duration::minutes(5) + Duration::minutes(30))
        );
        assert_eq!(view.rank_level, 3);
        assert_eq!(view.currency, 40);
        assert_ne!(view.unlocks.numeric, NumericUnlocks::default());
        assert_eq!(
            view.unlocks.spatial,
            UnlockTrees::default().spatial,
            "unplayed modes keep defaults"
        );
    }

    #[rstest]
    #[tokio::test]
    async fn unknown_accounts_are_reported(now: DateTime<Utc>) {
        let mut repo = MockProgressRepository::new();
        repo.expect_load_progress().return_once(|_| Ok(None));

        let err = service(repo, now)
            .progress(&AccountId::random())
            .await
            .expect_err("unknown account");
        assert_eq!(err.code(), ErrorCode::AccountNotFound);
    }

    #[rstest]
    #[case(ProgressRepositoryError::connection("refused"), ErrorCode::ServiceUnavailable)]
    #[case(ProgressRepositoryError::query("syntax"), ErrorCode::InternalError)]
    #[tokio::test]
    async fn repository_errors_are_mapped(
        now: DateTime<Utc>,
        #[case] error: ProgressRepositoryError,
        #[case] expected: ErrorCode,
    ) {
        let mut repo = MockProgressRepository::new();
        repo.expect_load_progress().return_once(move |_| Err(error));

        let err = service(repo, now)
            .progress(&AccountId::random())
            .await
            .expect_err("repository failed");
        assert_eq!(err.code(), expected);
    }
}
