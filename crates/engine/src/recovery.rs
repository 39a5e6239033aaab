//! Recovery policies: what each error kind does when it is handled.
//!
//! The orchestrator never inspects error kinds; it calls
//! [`HookError::handle`](crate::HookError::handle), which dispatches to the
//! policy the error dictionary attached.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use hooks::RawError;

use crate::error::HookError;
use crate::hook::Hook;

/// Default delay unit between transient retries.
pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(100);

/// Recovery capability attached to every classified error.
#[async_trait]
pub trait RecoveryPolicy: fmt::Debug + Send + Sync {
    /// Short name used in logs and serialized errors.
    fn name(&self) -> &'static str;

    /// Attempt recovery of `hook`, which failed with `error`.
    ///
    /// Return `Ok(())` after recovering (or after re-running the hook, whose
    /// new state the caller inspects), or `Err` with the raw error to give up.
    async fn recover(&self, hook: &mut Hook, error: &HookError) -> Result<(), RawError>;
}

// ---------------------------------------------------------------------------
// FailFast
// ---------------------------------------------------------------------------

/// Base kind: surface the original error immediately.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailFast;

#[async_trait]
impl RecoveryPolicy for FailFast {
    fn name(&self) -> &'static str {
        "fail_fast"
    }

    async fn recover(&self, _hook: &mut Hook, error: &HookError) -> Result<(), RawError> {
        Err(error.raw().clone())
    }
}

// ---------------------------------------------------------------------------
// Tentative
// ---------------------------------------------------------------------------

/// Transient kind: re-run the hook with a linearly growing delay until
/// `max_retries` retries have been spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tentative {
    pub max_retries: u32,
    /// Delay per attempt; the wait before a retry is `attempt * backoff_multiplier`.
    pub backoff_multiplier: Duration,
}

impl Tentative {
    pub fn new(max_retries: u32, backoff_multiplier: Duration) -> Self {
        Self {
            max_retries,
            backoff_multiplier,
        }
    }

    /// Wait before the retry that follows call number `call_count`.
    pub fn delay_for(&self, call_count: u32) -> Duration {
        self.backoff_multiplier * call_count.max(1)
    }
}

impl Default for Tentative {
    fn default() -> Self {
        Self::new(0, DEFAULT_BACKOFF)
    }
}

#[async_trait]
impl RecoveryPolicy for Tentative {
    fn name(&self) -> &'static str {
        "tentative"
    }

    async fn recover(&self, hook: &mut Hook, error: &HookError) -> Result<(), RawError> {
        let call_count = hook.call_count();
        if call_count > self.max_retries {
            return Err(error.raw().clone());
        }

        let delay = self.delay_for(call_count);
        warn!(
            "hook '{}' transient error (attempt {}/{}), retrying in {:?}: {}",
            hook.label(),
            call_count,
            self.max_retries,
            delay,
            error.raw()
        );

        tokio::time::sleep(delay).await;
        hook.call(Vec::new()).await;
        Ok(())
    }
}
