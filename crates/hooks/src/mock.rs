//! `MockHook`: a test double for `HookFn`.
//!
//! Useful in unit tests and in the CLI's simulated chains, where a real hook
//! body is either unavailable or irrelevant.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::{HookArgs, HookFn, HookOutcome, HookResult, RawError};

/// Shared, ordered record of which mock hooks ran.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Create an empty [`CallLog`].
pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Snapshot of a [`CallLog`].
pub fn entries(log: &CallLog) -> Vec<String> {
    log.lock().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Behaviour injected into `MockHook` at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MockBehaviour {
    /// Resolve with a specific JSON value.
    ReturnValue { value: Value },
    /// Resolve with `{ success: false, error }`.
    Unsuccessful {
        #[serde(default)]
        error: Option<RawError>,
    },
    /// Fail with the given error (the "thrown" path).
    Fail { error: RawError },
    /// Fail with `error` for the first `failures` calls, then resolve with `value`.
    Flaky {
        failures: u32,
        error: RawError,
        #[serde(default)]
        value: Value,
    },
    /// Resolve with `null` after asking the chain to skip to its finally hooks.
    SkipToFinally,
}

/// A mock hook that records every call it receives and returns a
/// programmer-specified result.
#[derive(Clone)]
pub struct MockHook {
    /// Label used in test assertions and call logs.
    pub name: String,
    /// What the hook will do when invoked.
    pub behaviour: MockBehaviour,
    /// Simulated latency before the behaviour applies.
    pub delay: Option<Duration>,
    /// Argument lists seen by this hook (in call order).
    pub calls: Arc<Mutex<Vec<Vec<Value>>>>,
    log: Option<CallLog>,
}

impl MockHook {
    pub fn new(name: impl Into<String>, behaviour: MockBehaviour) -> Self {
        Self {
            name: name.into(),
            behaviour,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            log: None,
        }
    }

    /// Create a mock that always succeeds with the given value.
    pub fn returning(name: impl Into<String>, value: Value) -> Self {
        Self::new(name, MockBehaviour::ReturnValue { value })
    }

    /// Create a mock that always fails with the given error.
    pub fn failing(name: impl Into<String>, error: RawError) -> Self {
        Self::new(name, MockBehaviour::Fail { error })
    }

    /// Create a mock that returns `{ success: false, error }`.
    pub fn unsuccessful(name: impl Into<String>, error: Option<RawError>) -> Self {
        Self::new(name, MockBehaviour::Unsuccessful { error })
    }

    /// Create a mock that fails `failures` times before succeeding.
    pub fn flaky(name: impl Into<String>, failures: u32, error: RawError, value: Value) -> Self {
        Self::new(name, MockBehaviour::Flaky { failures, error, value })
    }

    /// Append this hook's name to `log` on every call.
    pub fn logging_to(mut self, log: &CallLog) -> Self {
        self.log = Some(Arc::clone(log));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times this hook has been invoked.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Arguments of the `index`-th call.
    pub fn call_args(&self, index: usize) -> Option<Vec<Value>> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
    }
}

#[async_trait]
impl HookFn for MockHook {
    async fn invoke(&self, args: HookArgs) -> HookResult {
        let seen = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.push(args.args.clone());
            calls.len()
        };
        debug!(hook = %self.name, attempt = args.attempt, call = seen, "mock hook invoked");
        if let Some(log) = &self.log {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(self.name.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behaviour {
            MockBehaviour::ReturnValue { value } => Ok(HookOutcome::Success(value.clone())),
            MockBehaviour::Unsuccessful { error } => Ok(HookOutcome::Unsuccessful { error: error.clone() }),
            MockBehaviour::Fail { error } => Err(error.clone()),
            MockBehaviour::Flaky { failures, error, value } => {
                if seen <= *failures as usize {
                    Err(error.clone())
                } else {
                    Ok(HookOutcome::Success(value.clone()))
                }
            }
            MockBehaviour::SkipToFinally => {
                args.ctx.control.skip_to_finally();
                Ok(HookOutcome::done())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HookContext;
    use serde_json::json;

    fn args() -> HookArgs {
        HookArgs { ctx: HookContext::detached(), args: vec![json!("a")], attempt: 1 }
    }

    #[tokio::test]
    async fn flaky_mock_recovers_after_configured_failures() {
        let mock = MockHook::flaky("flaky", 2, RawError::named("ECONNRESET", "reset"), json!("ok"));
        assert!(mock.invoke(args()).await.is_err());
        assert!(mock.invoke(args()).await.is_err());
        assert_eq!(mock.invoke(args()).await, Ok(HookOutcome::Success(json!("ok"))));
        assert_eq!(mock.call_count(), 3);
        assert_eq!(mock.call_args(0), Some(vec![json!("a")]));
    }

    #[tokio::test]
    async fn clones_share_the_call_record() {
        let log = call_log();
        let mock = MockHook::returning("one", json!(1)).logging_to(&log);
        let handle = mock.clone();
        mock.invoke(args()).await.unwrap();
        assert_eq!(handle.call_count(), 1);
        assert_eq!(entries(&log), vec!["one"]);
    }

    #[test]
    fn behaviour_deserializes_from_tagged_json() {
        let behaviour: MockBehaviour =
            serde_json::from_value(json!({ "type": "fail", "error": { "name": "EPIPE", "message": "gone" } })).unwrap();
        assert_eq!(behaviour, MockBehaviour::Fail { error: RawError::named("EPIPE", "gone") });
    }
}
