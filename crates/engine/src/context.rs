//! Per-chain capability bundle: the error dictionary and the reaction to
//! failures nothing recovered from.
//!
//! A context is read-only while chains execute, so one `Arc<Context>` may be
//! shared by several chains.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use hooks::RawError;

use crate::dictionary::ErrorDictionary;
use crate::error::HookError;

/// Receives failures whose recovery policy gave up.
pub trait FailureSink: Send + Sync {
    fn unrecovered(&self, chain_kind: &str, error: &HookError, raw: &RawError);
}

/// Default sink: a diagnostic line plus the raw error, through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn unrecovered(&self, chain_kind: &str, error: &HookError, raw: &RawError) {
        error!(hook = %error.hook(), kind = error.key(), "hook error at {}", chain_kind);
        error!("{}", raw);
    }
}

pub struct Context {
    error_table: Arc<ErrorDictionary>,
    sink: Arc<dyn FailureSink>,
}

impl Context {
    pub fn new(error_table: ErrorDictionary) -> Self {
        Self::with_table(Arc::new(error_table))
    }

    /// Build around a dictionary shared with other contexts.
    pub fn with_table(error_table: Arc<ErrorDictionary>) -> Self {
        Self {
            error_table,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the failure reaction.
    pub fn with_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn error_table(&self) -> &ErrorDictionary {
        &self.error_table
    }

    /// Hand an unrecovered failure to the sink.
    pub fn report(&self, chain_kind: &str, error: &HookError, raw: &RawError) {
        self.sink.unrecovered(chain_kind, error, raw);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new(ErrorDictionary::default())
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("error_table", &self.error_table)
            .finish_non_exhaustive()
    }
}
