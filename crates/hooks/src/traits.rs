//! The `HookFn` trait: the contract every hook body must fulfil.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::RawError;

/// What a hook body resolves to. `Err` is the "thrown" path.
pub type HookResult = Result<HookOutcome, RawError>;

/// A hook body's non-throwing result.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    /// Plain value; treated as success.
    Success(Value),
    /// Structurally unsuccessful response. The error may be absent, which the
    /// engine classifies as a broken chain.
    Unsuccessful { error: Option<RawError> },
}

impl HookOutcome {
    /// Success carrying `null`.
    pub fn done() -> Self {
        Self::Success(Value::Null)
    }

    /// Unsuccessful response with an error attached.
    pub fn failed(error: RawError) -> Self {
        Self::Unsuccessful { error: Some(error) }
    }

    /// Unsuccessful response with no error object at all.
    pub fn broken() -> Self {
        Self::Unsuccessful { error: None }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Interpret a JSON value the way loosely-typed hook bodies report
    /// results: an object whose `success` field is exactly `false` is
    /// unsuccessful, anything else is a plain success value.
    pub fn from_value(value: Value) -> Self {
        let unsuccessful = value.get("success").and_then(Value::as_bool) == Some(false);
        if !unsuccessful {
            return Self::Success(value);
        }
        let error = match value.get("error") {
            None | Some(Value::Null) => None,
            Some(Value::String(message)) => Some(RawError::message(message.clone())),
            Some(other) => Some(
                serde_json::from_value::<RawError>(other.clone()).unwrap_or_else(|_| RawError {
                    name: other.get("name").and_then(Value::as_str).map(str::to_owned),
                    message: other.to_string(),
                }),
            ),
        };
        Self::Unsuccessful { error }
    }

    /// JSON rendering of the outcome, as stored in a hook's `result`.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Unsuccessful { error: None } => json!({ "success": false }),
            Self::Unsuccessful { error: Some(error) } => json!({ "success": false, "error": error }),
        }
    }
}

impl From<Value> for HookOutcome {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}

// ---------------------------------------------------------------------------
// ChainControl
// ---------------------------------------------------------------------------

/// Run-scoped switches a hook body may flip on its chain.
#[derive(Debug, Clone, Default)]
pub struct ChainControl {
    skip_to_finally: Arc<AtomicBool>,
}

impl ChainControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the remaining non-finally hooks once the current hook returns.
    pub fn skip_to_finally(&self) {
        self.skip_to_finally.store(true, Ordering::SeqCst);
    }

    pub fn skips_to_finally(&self) -> bool {
        self.skip_to_finally.load(Ordering::SeqCst)
    }

    /// Clear every switch. Called by the chain once a run has finished.
    pub fn reset(&self) {
        self.skip_to_finally.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// HookContext / HookArgs
// ---------------------------------------------------------------------------

/// Shared context passed to every hook body during execution.
///
/// Defined here (in the hooks crate) so both the engine and hook bodies can
/// import it without a circular dependency.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// ID of the chain run this hook belongs to.
    pub chain_id: Uuid,
    /// Options the chain was constructed with.
    pub options: Arc<Map<String, Value>>,
    /// Run-scoped control switches.
    pub control: ChainControl,
}

impl HookContext {
    /// A context not attached to any chain. Useful for calling hooks directly.
    pub fn detached() -> Self {
        Self {
            chain_id: Uuid::nil(),
            options: Arc::new(Map::new()),
            control: ChainControl::new(),
        }
    }

    /// Look up a chain option.
    pub fn option(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }
}

/// Everything handed to a hook body on one invocation.
#[derive(Debug, Clone)]
pub struct HookArgs {
    pub ctx: HookContext,
    /// Arguments fixed at registration, followed by call-time arguments.
    pub args: Vec<Value>,
    /// 1-based attempt number (the owning hook's call count).
    pub attempt: u32,
}

impl HookArgs {
    /// Positional argument, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }
}

// ---------------------------------------------------------------------------
// HookFn
// ---------------------------------------------------------------------------

/// The core hook-body trait.
///
/// Async closures `Fn(HookArgs) -> impl Future<Output = HookResult>` implement
/// it directly; wrap synchronous closures with [`sync_fn`].
#[async_trait]
pub trait HookFn: Send + Sync {
    /// Run the body once.
    async fn invoke(&self, args: HookArgs) -> HookResult;
}

#[async_trait]
impl<F, Fut> HookFn for F
where
    F: Fn(HookArgs) -> Fut + Send + Sync,
    Fut: Future<Output = HookResult> + Send + 'static,
{
    async fn invoke(&self, args: HookArgs) -> HookResult {
        (self)(args).await
    }
}

/// Adapter that lets a synchronous closure act as a hook body.
pub struct SyncFn<F>(pub F);

/// Wrap a synchronous closure as a [`HookFn`].
pub fn sync_fn<F>(f: F) -> SyncFn<F>
where
    F: Fn(HookArgs) -> HookResult + Send + Sync,
{
    SyncFn(f)
}

#[async_trait]
impl<F> HookFn for SyncFn<F>
where
    F: Fn(HookArgs) -> HookResult + Send + Sync,
{
    async fn invoke(&self, args: HookArgs) -> HookResult {
        (self.0)(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: Vec<Value>) -> HookArgs {
        HookArgs { ctx: HookContext::detached(), args: values, attempt: 1 }
    }

    #[test]
    fn success_false_object_is_unsuccessful() {
        let outcome = HookOutcome::from(json!({ "success": false, "error": { "name": "EPIPE", "message": "closed" } }));
        assert_eq!(outcome, HookOutcome::failed(RawError::named("EPIPE", "closed")));
    }

    #[test]
    fn success_false_without_error_is_broken() {
        assert_eq!(HookOutcome::from(json!({ "success": false })), HookOutcome::broken());
    }

    #[test]
    fn unshaped_error_keeps_name_when_present() {
        let outcome = HookOutcome::from(json!({ "success": false, "error": { "name": "ECONNRESET", "code": 104 } }));
        let HookOutcome::Unsuccessful { error: Some(error) } = outcome else {
            panic!("expected an unsuccessful outcome with an error");
        };
        assert_eq!(error.name(), Some("ECONNRESET"));
    }

    #[test]
    fn anything_else_is_a_plain_value() {
        for value in [json!(42), json!({ "success": true }), json!({ "success": null }), Value::Null] {
            assert!(HookOutcome::from(value).is_success());
        }
    }

    #[test]
    fn broken_outcome_renders_minimal_json() {
        assert_eq!(HookOutcome::broken().to_value(), json!({ "success": false }));
    }

    #[test]
    fn control_flag_resets() {
        let control = ChainControl::new();
        let shared = control.clone();
        shared.skip_to_finally();
        assert!(control.skips_to_finally());
        control.reset();
        assert!(!shared.skips_to_finally());
    }

    #[tokio::test]
    async fn async_closure_is_a_hook_fn() {
        let body = |a: HookArgs| async move { Ok::<_, RawError>(HookOutcome::Success(json!(a.args.len()))) };
        let result = body.invoke(args(vec![json!(1), json!(2)])).await;
        assert_eq!(result, Ok(HookOutcome::Success(json!(2))));
    }

    #[tokio::test]
    async fn sync_closure_is_a_hook_fn() {
        let body = sync_fn(|a: HookArgs| match a.arg(0) {
            Some(v) => Ok(HookOutcome::Success(v.clone())),
            None => Err(RawError::message("missing argument")),
        });
        assert_eq!(body.invoke(args(vec![json!("x")])).await, Ok(HookOutcome::Success(json!("x"))));
        assert!(body.invoke(args(vec![])).await.is_err());
    }
}
