//! HTTP inbound adapter exposing the REST endpoints.

pub mod error;
pub mod health;
pub mod idempotency;
pub mod leaderboards;
pub mod progress;
pub mod session;
pub mod sessions;
pub mod state;
#[cfg(test)]
pub mod test_utils;

pub use error::ApiResult;
