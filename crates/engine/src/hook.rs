//! `Hook`: one registered unit of work and its execution state.
//!
//! A hook wraps a [`HookFn`] body, runs it, normalizes whatever it returns
//! into `success`/`result`/`error`, and classifies failures through its
//! context's error dictionary.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use hooks::{HookArgs, HookContext, HookFn, HookOutcome, RawError};

use crate::context::Context;
use crate::error::HookError;
use crate::models::{HookRef, Phase};

pub struct Hook {
    phase: Phase,
    label: String,
    body: Arc<dyn HookFn>,
    context: Arc<Context>,
    hook_ctx: HookContext,
    bound: Vec<Value>,
    called: bool,
    call_count: u32,
    success: bool,
    result: Option<Value>,
    error: Option<HookError>,
}

impl Hook {
    pub fn new(
        phase: Phase,
        label: impl Into<String>,
        body: Arc<dyn HookFn>,
        context: Arc<Context>,
    ) -> Self {
        Self {
            phase,
            label: label.into(),
            body,
            context,
            hook_ctx: HookContext::detached(),
            bound: Vec::new(),
            called: false,
            call_count: 0,
            success: true,
            result: None,
            error: None,
        }
    }

    /// Fix arguments that precede every call's own arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.bound = args;
        self
    }

    /// Attach the chain-side context handed to the body.
    pub fn with_hook_context(mut self, hook_ctx: HookContext) -> Self {
        self.hook_ctx = hook_ctx;
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn reference(&self) -> HookRef {
        HookRef {
            phase: self.phase,
            label: self.label.clone(),
        }
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    pub fn called(&self) -> bool {
        self.called
    }

    pub fn call_count(&self) -> u32 {
        self.call_count
    }

    pub fn success(&self) -> bool {
        self.success
    }

    /// Last outcome the body resolved to; `None` before the first call or
    /// after the body failed outright.
    pub fn result(&self) -> Option<&Value> {
        self.result.as_ref()
    }

    /// The classified error of the last call, set iff `success()` is false.
    pub fn error(&self) -> Option<&HookError> {
        self.error.as_ref()
    }

    /// Invoke the body once with the bound arguments followed by `args`.
    pub async fn call(&mut self, args: Vec<Value>) -> &mut Self {
        self.call_count += 1;
        self.called = true;

        let mut all_args = self.bound.clone();
        all_args.extend(args);
        let invocation = HookArgs {
            ctx: self.hook_ctx.clone(),
            args: all_args,
            attempt: self.call_count,
        };

        match self.body.invoke(invocation).await {
            Ok(HookOutcome::Success(value)) => {
                debug!("hook '{}' succeeded (call {})", self.label, self.call_count);
                self.result = Some(value);
                self.success = true;
                self.error = None;
            }
            Ok(HookOutcome::Unsuccessful { error }) => {
                self.result = Some(HookOutcome::Unsuccessful { error: error.clone() }.to_value());
                self.fail(error);
            }
            Err(raw) => {
                self.result = None;
                self.fail(Some(raw));
            }
        }
        self
    }

    /// Keep handling this hook's error until it recovers or a policy gives up.
    ///
    /// A retry that fails again produces a fresh error whose own policy runs
    /// next. A policy that returns `Ok` without re-running the hook counts as
    /// recovered.
    pub async fn settle(&mut self) -> Result<(), RawError> {
        while let Some(error) = self.error.clone() {
            let calls_before = self.call_count;
            error.handle(self).await?;
            if self.call_count == calls_before {
                break;
            }
        }
        Ok(())
    }

    fn fail(&mut self, raw: Option<RawError>) {
        let (key, policy) = self.context.error_table().resolve(raw.as_ref());
        let raw = raw.unwrap_or_else(|| {
            let rendered = self.result.as_ref().map_or_else(|| "null".to_owned(), Value::to_string);
            RawError::message(format!("unsuccessful response: {rendered}"))
        });
        debug!("hook '{}' failed [{}] (call {}): {}", self.label, key, self.call_count, raw);
        self.error = Some(HookError::new(key, self.reference(), raw, policy));
        self.success = false;
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook")
            .field("phase", &self.phase)
            .field("label", &self.label)
            .field("called", &self.called)
            .field("call_count", &self.call_count)
            .field("success", &self.success)
            .field("result", &self.result)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
