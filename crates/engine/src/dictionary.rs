//! Error dictionary: maps a raw error's discriminator to a recovery policy.
//!
//! Resolution rules:
//! 1. No raw error at all → `BROKEN_CHAIN` (or `DEFAULT` if that key is absent).
//! 2. Raw error without a name, or with an unmapped name → `DEFAULT`.
//! 3. Otherwise → the entry registered under the name.
//!
//! `DEFAULT` is supplied at construction and can be replaced but never
//! removed, so every lookup resolves.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use hooks::RawError;

use crate::config::ErrorTableConfig;
use crate::error::EngineError;
use crate::recovery::{FailFast, RecoveryPolicy, Tentative};

/// Fallback key.
pub const DEFAULT: &str = "DEFAULT";

/// Key for unsuccessful outcomes that carry no error object.
pub const BROKEN_CHAIN: &str = "BROKEN_CHAIN";

/// Connection-style discriminators the default dictionary treats as transient.
pub const TRANSIENT_NAMES: [&str; 4] = ["ECONNREFUSED", "ECONNRESET", "EPIPE", "ERR_STREAM_DESTROYED"];

/// Discriminator → recovery policy table.
#[derive(Clone)]
pub struct ErrorDictionary {
    default: Arc<dyn RecoveryPolicy>,
    entries: HashMap<String, Arc<dyn RecoveryPolicy>>,
}

impl ErrorDictionary {
    /// A dictionary holding only the mandatory `DEFAULT` entry.
    pub fn new(default: impl RecoveryPolicy + 'static) -> Self {
        Self {
            default: Arc::new(default),
            entries: HashMap::new(),
        }
    }

    /// Register `policy` under `key`. Inserting `DEFAULT` replaces the fallback.
    pub fn insert(&mut self, key: impl Into<String>, policy: impl RecoveryPolicy + 'static) -> &mut Self {
        self.insert_shared(key, Arc::new(policy))
    }

    pub fn insert_shared(&mut self, key: impl Into<String>, policy: Arc<dyn RecoveryPolicy>) -> &mut Self {
        let key = key.into();
        if key == DEFAULT {
            self.default = policy;
        } else {
            self.entries.insert(key, policy);
        }
        self
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, policy: impl RecoveryPolicy + 'static) -> Self {
        self.insert(key, policy);
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        key == DEFAULT || self.entries.contains_key(key)
    }

    /// Policy registered under `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Arc<dyn RecoveryPolicy>> {
        if key == DEFAULT {
            Some(&self.default)
        } else {
            self.entries.get(key)
        }
    }

    /// All keys, sorted, `DEFAULT` included.
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.push(DEFAULT);
        keys.sort_unstable();
        keys
    }

    /// The key a raw error (or its absence) classifies under.
    pub fn resolve_key<'a>(&self, raw: Option<&'a RawError>) -> &'a str {
        match raw {
            None if self.entries.contains_key(BROKEN_CHAIN) => BROKEN_CHAIN,
            None => DEFAULT,
            Some(raw) => match raw.name() {
                Some(name) if self.contains(name) => name,
                _ => DEFAULT,
            },
        }
    }

    /// Resolved key together with its policy.
    pub fn resolve(&self, raw: Option<&RawError>) -> (String, Arc<dyn RecoveryPolicy>) {
        let key = self.resolve_key(raw);
        let policy = self.get(key).cloned().unwrap_or_else(|| Arc::clone(&self.default));
        (key.to_owned(), policy)
    }

    /// Build a dictionary from configuration. `DEFAULT` and `BROKEN_CHAIN`
    /// are always present and fail fast unless configured otherwise. Without
    /// a declared transient table the connection-style names are seeded as
    /// tentative, and `fail_fast` entries override them.
    ///
    /// # Errors
    /// - [`EngineError::EmptyErrorKey`] for an empty key.
    /// - [`EngineError::ConflictingErrorKey`] when a key is declared both
    ///   transient and fail-fast.
    pub fn from_config(config: &ErrorTableConfig) -> Result<Self, EngineError> {
        let mut table = Self::new(FailFast).with(BROKEN_CHAIN, FailFast);

        match &config.transient {
            Some(transient) => {
                for (key, retry) in transient {
                    if key.is_empty() {
                        return Err(EngineError::EmptyErrorKey);
                    }
                    if config.fail_fast.contains(key) {
                        return Err(EngineError::ConflictingErrorKey(key.clone()));
                    }
                    table.insert(key.clone(), retry.policy());
                }
            }
            None => {
                for name in TRANSIENT_NAMES {
                    table.insert(name, Tentative::default());
                }
            }
        }

        for key in &config.fail_fast {
            if key.is_empty() {
                return Err(EngineError::EmptyErrorKey);
            }
            table.insert(key.clone(), FailFast);
        }

        Ok(table)
    }
}

impl Default for ErrorDictionary {
    /// The standard population: connection-style names are tentative with no
    /// retries, everything else fails fast.
    fn default() -> Self {
        let mut table = Self::new(FailFast).with(BROKEN_CHAIN, FailFast);
        for name in TRANSIENT_NAMES {
            table.insert(name, Tentative::default());
        }
        table
    }
}

impl fmt::Debug for ErrorDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for key in self.keys() {
            if let Some(policy) = self.get(key) {
                map.entry(&key, &policy.name());
            }
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::{ChainConfig, TentativeConfig};

    #[test]
    fn default_population() {
        let table = ErrorDictionary::default();
        assert_eq!(
            table.keys(),
            vec![BROKEN_CHAIN, DEFAULT, "ECONNREFUSED", "ECONNRESET", "EPIPE", "ERR_STREAM_DESTROYED"]
        );
        for name in TRANSIENT_NAMES {
            assert_eq!(table.get(name).map(|p| p.name()), Some("tentative"));
        }
        assert_eq!(table.get(DEFAULT).map(|p| p.name()), Some("fail_fast"));
        assert_eq!(table.get(BROKEN_CHAIN).map(|p| p.name()), Some("fail_fast"));
    }

    #[test]
    fn mapped_name_resolves_to_itself() {
        let raw = RawError::named("EPIPE", "closed");
        assert_eq!(ErrorDictionary::default().resolve_key(Some(&raw)), "EPIPE");
    }

    #[test]
    fn unmapped_or_unnamed_errors_fall_back_to_default() {
        let table = ErrorDictionary::default();
        assert_eq!(table.resolve_key(Some(&RawError::named("EWHATEVER", "?"))), DEFAULT);
        assert_eq!(table.resolve_key(Some(&RawError::message("no name"))), DEFAULT);
    }

    #[test]
    fn missing_error_resolves_to_broken_chain() {
        assert_eq!(ErrorDictionary::default().resolve_key(None), BROKEN_CHAIN);
        // A table without the broken-chain entry still resolves.
        assert_eq!(ErrorDictionary::new(FailFast).resolve_key(None), DEFAULT);
    }

    #[test]
    fn inserting_default_replaces_the_fallback() {
        let table = ErrorDictionary::new(FailFast).with(DEFAULT, Tentative::default());
        let (key, policy) = table.resolve(Some(&RawError::message("x")));
        assert_eq!(key, DEFAULT);
        assert_eq!(policy.name(), "tentative");
    }

    #[test]
    fn config_builds_transient_and_fail_fast_entries() {
        let config = ErrorTableConfig::empty()
            .with_transient("ETIMEDOUT", TentativeConfig { max_retries: 2, backoff_ms: 10 })
            .with_fail_fast("ECONNRESET");

        let table = ErrorDictionary::from_config(&config).expect("valid config");
        assert_eq!(table.keys(), vec![BROKEN_CHAIN, DEFAULT, "ECONNRESET", "ETIMEDOUT"]);
        assert_eq!(table.get("ECONNRESET").map(|p| p.name()), Some("fail_fast"));
        assert_eq!(table.get("ETIMEDOUT").map(|p| p.name()), Some("tentative"));
        assert_eq!(
            TentativeConfig { max_retries: 2, backoff_ms: 10 }.policy(),
            Tentative::new(2, Duration::from_millis(10))
        );
    }

    #[test]
    fn conflicting_config_is_rejected() {
        let config = ErrorTableConfig::empty()
            .with_transient("EPIPE", TentativeConfig::default())
            .with_fail_fast("EPIPE");
        assert!(matches!(
            ErrorDictionary::from_config(&config),
            Err(EngineError::ConflictingErrorKey(key)) if key == "EPIPE"
        ));
    }

    #[test]
    fn empty_key_is_rejected() {
        let config = ErrorTableConfig::empty().with_fail_fast("");
        assert!(matches!(ErrorDictionary::from_config(&config), Err(EngineError::EmptyErrorKey)));
    }

    #[test]
    fn unconfigured_table_seeds_the_default_population() {
        let table = ErrorDictionary::from_config(&ErrorTableConfig::default()).expect("valid config");
        assert_eq!(table.keys(), ErrorDictionary::default().keys());
        assert_eq!(table.get("EPIPE").map(|p| p.name()), Some("tentative"));
    }

    #[test]
    fn fail_fast_overrides_a_seeded_transient_name() {
        let config = ChainConfig::from_json(r#"{ "error_table": { "fail_fast": ["ECONNRESET"] } }"#)
            .expect("valid json");
        let table = ErrorDictionary::from_config(&config.error_table).expect("valid config");

        let (key, policy) = table.resolve(Some(&RawError::named("ECONNRESET", "reset")));
        assert_eq!(key, "ECONNRESET");
        assert_eq!(policy.name(), "fail_fast");
        // The other seeded names keep retrying.
        assert_eq!(table.get("EPIPE").map(|p| p.name()), Some("tentative"));
    }
}
