//! Builders wiring the driven adapters into the HTTP state's driving ports.

use std::sync::Arc;

use actix_web::web;
use mockable::{Clock, DefaultClock};

use cogtrain::domain::ports::{
    FeatureConfigRepository, LeaderboardRepository, ProgressRepository, SettlementRepository,
};
use cogtrain::domain::{EnergyPolicy, LeaderboardService, ProgressService, SettlementService};
use cogtrain::inbound::http::state::HttpState;
use cogtrain::outbound::persistence::{
    DieselFeatureConfigRepository, DieselLeaderboardRepository, DieselProgressRepository,
    DieselSettlementRepository,
};

use super::config::{ServerConfig, StoreBackend};

/// Driven adapters for the three services.
struct Adapters<S, L, P, F> {
    settlement: Arc<S>,
    leaderboards: Arc<L>,
    progress: Arc<P>,
    features: Arc<F>,
}

fn assemble<S, L, P, F>(
    adapters: Adapters<S, L, P, F>,
    policy: EnergyPolicy,
    clock: Arc<dyn Clock>,
) -> HttpState
where
    S: SettlementRepository + 'static,
    L: LeaderboardRepository + 'static,
    P: ProgressRepository + 'static,
    F: FeatureConfigRepository + 'static,
{
    let Adapters {
        settlement,
        leaderboards,
        progress,
        features,
    } = adapters;
    HttpState::new(
        Arc::new(SettlementService::new(settlement, policy, clock.clone())),
        Arc::new(LeaderboardService::new(leaderboards, features, clock.clone())),
        Arc::new(ProgressService::new(progress, policy, clock)),
    )
}

fn build_with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> HttpState {
    match &config.store {
        StoreBackend::Postgres(pool) => assemble(
            Adapters {
                settlement: Arc::new(DieselSettlementRepository::new(pool.clone())),
                leaderboards: Arc::new(DieselLeaderboardRepository::new(pool.clone())),
                progress: Arc::new(DieselProgressRepository::new(pool.clone())),
                features: Arc::new(DieselFeatureConfigRepository::new(pool.clone())),
            },
            config.policy,
            clock,
        ),
        StoreBackend::Memory(store) => assemble(
            Adapters {
                settlement: store.clone(),
                leaderboards: store.clone(),
                progress: store.clone(),
                features: store.clone(),
            },
            config.policy,
            clock,
        ),
    }
}

/// Build the shared HTTP state for the configured store.
pub(super) fn build_http_state(config: &ServerConfig) -> web::Data<HttpState> {
    web::Data::new(build_with_clock(config, Arc::new(DefaultClock)))
}
