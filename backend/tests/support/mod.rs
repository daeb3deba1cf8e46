//! Shared helpers for the integration tests.
//!
//! Every test here runs against the in-memory store, wired into the real
//! domain services with a clock the test can move.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Local, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};

use cogtrain::domain::ports::{SettleSessionRequest, SettlementRepository};
use cogtrain::domain::settlement::SessionOutcomePayload;
use cogtrain::domain::{
    AccountAggregate, AccountId, EnergyPolicy, IdempotencyKey, SettlementService,
};
use cogtrain::outbound::memory::MemoryStore;

/// Clock frozen at a settable instant.
pub struct SteppingClock {
    now: Mutex<DateTime<Utc>>,
}

impl SteppingClock {
    pub fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self {
            now: Mutex::new(now),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for SteppingClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mid-morning on a fixed Monday.
pub fn monday_morning() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 30, 0)
        .single()
        .expect("valid timestamp")
}

/// Store holding one account per `(name, xp, currency)` triple, each with
/// a full energy bar.
pub async fn store_with(accounts: &[(&str, u64, u64)]) -> (Arc<MemoryStore>, Vec<AccountId>) {
    let store = Arc::new(MemoryStore::new());
    let mut ids = Vec::with_capacity(accounts.len());
    for (name, xp, currency) in accounts {
        let id = AccountId::random();
        let mut account = AccountAggregate::new(id.clone(), *name, EnergyPolicy::default().max());
        account.xp = *xp;
        account.currency = *currency;
        store.seed_account(account).await;
        ids.push(id);
    }
    (store, ids)
}

/// Numeric session below the qualifying accuracy, so energy is spent and
/// nothing unlocks.
pub fn casual_numeric_payload() -> Value {
    json!({
        "accuracy": 60,
        "config": {"mode": "numeric", "depth": 1, "totalRounds": 5},
        "correctCount": 3,
        "incorrectCount": 2,
        "missedCount": 0,
        "durationMs": 42_000
    })
}

pub fn settle_request(
    account_id: &AccountId,
    payload: Value,
    idempotency_key: Option<&str>,
) -> SettleSessionRequest {
    SettleSessionRequest {
        account_id: account_id.clone(),
        idempotency_key: idempotency_key
            .map(|raw| IdempotencyKey::new(raw).expect("valid idempotency key")),
        payload: serde_json::from_value::<SessionOutcomePayload>(payload)
            .expect("payload decodes"),
    }
}

pub fn settlement_service<R>(store: Arc<R>, clock: Arc<SteppingClock>) -> SettlementService<R>
where
    R: SettlementRepository,
{
    SettlementService::new(store, EnergyPolicy::default(), clock)
}
