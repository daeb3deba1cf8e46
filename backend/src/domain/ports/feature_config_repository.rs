//! Port for reading externally owned feature configuration rows.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::define_port_error;

define_port_error! {
    /// Errors raised by feature configuration adapters.
    pub enum FeatureConfigRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "feature config repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "feature config repository query failed: {message}",
    }
}

/// Read-only access to feature configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeatureConfigRepository: Send + Sync {
    /// Every row whose key starts with `prefix`.
    async fn load_prefixed(
        &self,
        prefix: &str,
    ) -> Result<BTreeMap<String, Value>, FeatureConfigRepositoryError>;
}

/// Fixture implementation with no rows, so every flag takes its default.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixtureFeatureConfigRepository;

#[async_trait]
impl FeatureConfigRepository for FixtureFeatureConfigRepository {
    async fn load_prefixed(
        &self,
        _prefix: &str,
    ) -> Result<BTreeMap<String, Value>, FeatureConfigRepositoryError> {
        Ok(BTreeMap::new())
    }
}
