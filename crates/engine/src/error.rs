//! Engine-level error types.
//!
//! [`HookError`] is the typed, self-handling failure a hook ends up with once
//! the error dictionary has classified its raw error. [`EngineError`] covers
//! configuration problems, which are the only way the engine itself fails.

use std::fmt;
use std::sync::Arc;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

use hooks::RawError;

use crate::hook::Hook;
use crate::models::HookRef;
use crate::recovery::RecoveryPolicy;

/// A classified hook failure that knows how to handle itself.
#[derive(Clone, Error)]
#[error("hook '{hook}' failed [{key}]: {source}")]
pub struct HookError {
    key: String,
    hook: HookRef,
    source: RawError,
    policy: Arc<dyn RecoveryPolicy>,
}

impl HookError {
    pub fn new(
        key: impl Into<String>,
        hook: HookRef,
        source: RawError,
        policy: Arc<dyn RecoveryPolicy>,
    ) -> Self {
        Self {
            key: key.into(),
            hook,
            source,
            policy,
        }
    }

    /// Dictionary key this error was classified under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The hook that failed.
    pub fn hook(&self) -> &HookRef {
        &self.hook
    }

    /// The original error reported by the hook body.
    pub fn raw(&self) -> &RawError {
        &self.source
    }

    pub fn policy(&self) -> &dyn RecoveryPolicy {
        self.policy.as_ref()
    }

    /// Run this error's recovery policy against its hook.
    ///
    /// `Ok` means recovery succeeded or a retry was performed (the hook's own
    /// state tells which); `Err` surfaces the original raw error.
    pub async fn handle(&self, hook: &mut Hook) -> Result<(), RawError> {
        self.policy.recover(hook, self).await
    }
}

impl fmt::Debug for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookError")
            .field("key", &self.key)
            .field("hook", &self.hook.label)
            .field("policy", &self.policy.name())
            .field("source", &self.source)
            .finish()
    }
}

impl Serialize for HookError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("HookError", 5)?;
        state.serialize_field("kind", &self.key)?;
        state.serialize_field("policy", self.policy.name())?;
        state.serialize_field("phase", &self.hook.phase)?;
        state.serialize_field("hook", &self.hook.label)?;
        state.serialize_field("error", &self.source)?;
        state.end()
    }
}

/// Errors produced by the engine while building chains from configuration.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An error table entry with an empty key.
    #[error("error table keys must not be empty")]
    EmptyErrorKey,

    /// The same key appears in more than one policy group.
    #[error("error table key '{0}' is declared both transient and fail-fast")]
    ConflictingErrorKey(String),

    /// Malformed configuration document.
    #[error("invalid chain configuration: {0}")]
    Config(#[from] serde_json::Error),
}
