//! Chain configuration, loadable from JSON.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::models::ChainOptions;
use crate::recovery::Tentative;

// ---------------------------------------------------------------------------
// ChainConfig
// ---------------------------------------------------------------------------

/// Tuning knobs for a chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Chain kind, reported in failure diagnostics.
    pub name: String,
    /// Stop the non-finally hooks at the first unrecovered failure.
    pub should_break: bool,
    /// Free-form options handed to every hook body.
    pub options: ChainOptions,
    pub error_table: ErrorTableConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "Chain".to_owned(),
            should_break: true,
            options: ChainOptions::new(),
            error_table: ErrorTableConfig::default(),
        }
    }
}

impl ChainConfig {
    /// Parse a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }
}

// ---------------------------------------------------------------------------
// ErrorTableConfig
// ---------------------------------------------------------------------------

/// Population of the error dictionary. `DEFAULT` and `BROKEN_CHAIN` are
/// always present and need not be listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorTableConfig {
    /// Discriminators retried with backoff. When absent, the connection-style
    /// names are seeded with default retry settings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transient: Option<BTreeMap<String, TentativeConfig>>,
    /// Discriminators that fail immediately. These override seeded names.
    pub fail_fast: BTreeSet<String>,
}

impl ErrorTableConfig {
    /// A table with no entries beyond the mandatory ones.
    pub fn empty() -> Self {
        Self {
            transient: Some(BTreeMap::new()),
            fail_fast: BTreeSet::new(),
        }
    }

    /// Declare `key` transient with `retry` settings.
    pub fn with_transient(mut self, key: impl Into<String>, retry: TentativeConfig) -> Self {
        self.transient.get_or_insert_with(BTreeMap::new).insert(key.into(), retry);
        self
    }

    /// Declare `key` fail-fast.
    pub fn with_fail_fast(mut self, key: impl Into<String>) -> Self {
        self.fail_fast.insert(key.into());
        self
    }
}

/// Retry settings for one transient discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TentativeConfig {
    pub max_retries: u32,
    /// Delay unit in milliseconds; retry `n` waits `n * backoff_ms`.
    pub backoff_ms: u64,
}

impl Default for TentativeConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff_ms: 100,
        }
    }
}

impl TentativeConfig {
    pub fn policy(&self) -> Tentative {
        Tentative::new(self.max_retries, Duration::from_millis(self.backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ChainConfig::from_json("{}").expect("valid json");
        assert_eq!(config, ChainConfig::default());
        assert!(config.should_break);
        assert!(config.error_table.transient.is_none());
    }

    #[test]
    fn partial_entries_fill_in_defaults() {
        let config = ChainConfig::from_json(
            r#"{
                "name": "Checkout",
                "should_break": false,
                "options": { "tenant": "acme" },
                "error_table": { "transient": { "ECONNRESET": { "max_retries": 3 } } }
            }"#,
        )
        .expect("valid json");

        assert_eq!(config.name, "Checkout");
        assert!(!config.should_break);
        assert_eq!(config.options["tenant"], "acme");
        let transient = config.error_table.transient.expect("declared transient table");
        assert_eq!(transient["ECONNRESET"], TentativeConfig { max_retries: 3, backoff_ms: 100 });
        // An explicit table replaces the default population.
        assert_eq!(transient.len(), 1);
    }

    #[test]
    fn fail_fast_only_table_leaves_transient_undeclared() {
        let config = ChainConfig::from_json(r#"{ "error_table": { "fail_fast": ["ECONNRESET"] } }"#)
            .expect("valid json");
        assert!(config.error_table.transient.is_none());
        assert_eq!(config.error_table, ErrorTableConfig::default().with_fail_fast("ECONNRESET"));
    }

    #[test]
    fn malformed_document_is_a_config_error() {
        assert!(matches!(
            ChainConfig::from_json(r#"{ "should_break": "yes" }"#),
            Err(EngineError::Config(_))
        ));
    }
}
