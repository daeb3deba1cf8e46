//! Account aggregate and identifiers.
//!
//! The aggregate mirrors one `accounts` row. Rank level is intentionally not a
//! field: it is derived from `xp` via [`rank_level`] whenever it is read.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::rewards::rank_level;

/// Validation errors returned by [`AccountId::new`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountValidationError {
    /// The identifier was empty.
    #[error("account id must not be empty")]
    EmptyId,
    /// The identifier was not a UUID.
    #[error("account id must be a valid UUID")]
    InvalidId,
}

/// Stable account identifier stored as a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(Uuid, String);

impl AccountId {
    /// Validate and construct an [`AccountId`] from borrowed input.
    ///
    /// # Examples
    /// ```
    /// use cogtrain::domain::AccountId;
    ///
    /// let id = AccountId::new("3fa85f64-5717-4562-b3fc-2c963f66afa6").expect("valid id");
    /// assert_eq!(id.as_ref(), "3fa85f64-5717-4562-b3fc-2c963f66afa6");
    /// ```
    pub fn new(id: impl AsRef<str>) -> Result<Self, AccountValidationError> {
        Self::from_owned(id.as_ref().to_owned())
    }

    /// Wrap an already validated UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid, uuid.to_string())
    }

    /// Generate a new random [`AccountId`].
    pub fn random() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    fn from_owned(id: String) -> Result<Self, AccountValidationError> {
        if id.is_empty() {
            return Err(AccountValidationError::EmptyId);
        }
        if id.trim() != id {
            return Err(AccountValidationError::InvalidId);
        }
        let parsed = Uuid::parse_str(&id).map_err(|_| AccountValidationError::InvalidId)?;
        Ok(Self(parsed, id))
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        self.1.as_str()
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_ref())
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        value.1
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_owned(value)
    }
}

/// Stored energy columns of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnergyState {
    /// Units currently available.
    pub current: u32,
    /// Anchor of the recovery clock; `None` until first spent.
    pub updated_at: Option<DateTime<Utc>>,
    /// While in the future, energy reads as full and is never spent.
    pub unlimited_until: Option<DateTime<Utc>>,
}

impl EnergyState {
    /// Whether unlimited energy is active at `now`.
    pub fn is_unlimited_at(&self, now: DateTime<Utc>) -> bool {
        self.unlimited_until.is_some_and(|until| until > now)
    }
}

/// Daily check-in streak bookkeeping, maintained by the check-in collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CheckinState {
    /// Consecutive days checked in.
    pub streak: u32,
    /// Most recent check-in day.
    pub last_checkin_on: Option<NaiveDate>,
}

/// Durable per-account progression state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountAggregate {
    /// Stable account identifier.
    pub id: AccountId,
    /// Name shown on leaderboards.
    pub display_name: String,
    /// Experience points; never decreases.
    pub xp: u64,
    /// Soft currency balance.
    pub currency: u64,
    /// Stored energy balance and its regeneration anchor.
    pub energy: EnergyState,
    /// Daily check-in streak.
    pub checkin: CheckinState,
    /// Store items the account owns.
    pub owned_items: Vec<String>,
    /// Consumable item counts by item id.
    pub inventory: BTreeMap<String, u32>,
}

impl AccountAggregate {
    /// Fresh account with the given starting energy.
    pub fn new(id: AccountId, display_name: impl Into<String>, energy: u32) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            xp: 0,
            currency: 0,
            energy: EnergyState {
                current: energy,
                updated_at: None,
                unlimited_until: None,
            },
            checkin: CheckinState::default(),
            owned_items: Vec::new(),
            inventory: BTreeMap::new(),
        }
    }

    /// Rank level derived from the stored experience.
    pub fn rank_level(&self) -> u8 {
        rank_level(self.xp)
    }
}
