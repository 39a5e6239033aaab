//! Chain execution engine.
//!
//! `Chain` is the central orchestrator:
//! 1. Collects hooks into five phase buckets (`initially` is a stack, the
//!    rest are queues).
//! 2. Runs `initially ++ before ++ main ++ after` in order, handing every
//!    failure to its own error's recovery policy.
//! 3. Stops that list at the first unrecovered failure when `should_break`
//!    is set, or when a hook asks to skip to the finally phase.
//! 4. Always runs every `finally` hook afterwards.
//! 5. Returns a [`Yield`] carrying every error seen; a run never fails.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use hooks::{ChainControl, HookContext, HookFn};

use crate::bucket::{HookBucket, Queue, Stack};
use crate::config::ChainConfig;
use crate::context::Context;
use crate::dictionary::ErrorDictionary;
use crate::error::{EngineError, HookError};
use crate::hook::Hook;
use crate::models::{ChainOptions, HookRef, Phase, Yield};

/// Which list `run_hooks` is draining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pass {
    Pipeline,
    Finally,
}

/// One staged pipeline run.
///
/// Register hooks with the phase methods (they return `&mut Self`, so calls
/// chain), then call [`Chain::exec`] once.
pub struct Chain {
    id: Uuid,
    kind: String,
    options: Arc<ChainOptions>,
    context: Arc<Context>,
    control: ChainControl,

    initially: Stack<Hook>,
    before: Queue<Hook>,
    main: Queue<Hook>,
    after: Queue<Hook>,
    finally: Queue<Hook>,
    registered: usize,

    created_at: DateTime<Utc>,
    started: Instant,
    duration: Option<Duration>,
    should_break: bool,
    errors: Vec<HookError>,
    yielded: Yield,
    current_hook: Option<HookRef>,
    executed: Vec<Hook>,
}

impl Default for Chain {
    fn default() -> Self {
        Self::new()
    }
}

impl Chain {
    pub fn new() -> Self {
        Self::with_options(ChainOptions::new())
    }

    /// Create a chain whose hooks all see `options`.
    pub fn with_options(options: ChainOptions) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: "Chain".to_owned(),
            options: Arc::new(options),
            context: Arc::new(Context::default()),
            control: ChainControl::new(),
            initially: Stack::new(),
            before: Queue::new(),
            main: Queue::new(),
            after: Queue::new(),
            finally: Queue::new(),
            registered: 0,
            created_at: Utc::now(),
            started: Instant::now(),
            duration: None,
            should_break: true,
            errors: Vec::new(),
            yielded: Yield::default(),
            current_hook: None,
            executed: Vec::new(),
        }
    }

    /// Build a chain (and its context) from configuration.
    ///
    /// # Errors
    /// Returns [`EngineError`] when the error table configuration is invalid.
    pub fn from_config(config: ChainConfig) -> Result<Self, EngineError> {
        let table = ErrorDictionary::from_config(&config.error_table)?;
        let mut chain = Self::with_options(config.options)
            .with_kind(config.name)
            .with_context(Arc::new(Context::new(table)));
        chain.set_should_break(config.should_break);
        Ok(chain)
    }

    /// Replace the context. Hooks registered afterwards use the new one.
    pub fn with_context(mut self, context: Arc<Context>) -> Self {
        self.context = context;
        self
    }

    /// Name reported in failure diagnostics.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn set_should_break(&mut self, should_break: bool) -> &mut Self {
        self.should_break = should_break;
        self
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    pub fn initially<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::Initially, body, Vec::new())
    }

    pub fn before<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::Before, body, Vec::new())
    }

    pub fn main<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::Main, body, Vec::new())
    }

    pub fn after<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::After, body, Vec::new())
    }

    pub fn finally<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::Finally, body, Vec::new())
    }

    /// Append to the most recently filled phase, checked as
    /// `finally, after, main, before, initially`; `initially` when all are empty.
    pub fn and_then<F: HookFn + 'static>(&mut self, body: F) -> &mut Self {
        self.hook(Phase::AndThen, body, Vec::new())
    }

    /// Register `body` under `phase` with fixed leading arguments.
    pub fn hook<F: HookFn + 'static>(&mut self, phase: Phase, body: F, args: Vec<Value>) -> &mut Self {
        self.register(phase, None, Arc::new(body), args)
    }

    /// Like [`hook`](Self::hook), labelling the hook `{name}#{n}` instead of
    /// `{phase}#{n}`.
    pub fn named_hook<F: HookFn + 'static>(
        &mut self,
        phase: Phase,
        name: &str,
        body: F,
        args: Vec<Value>,
    ) -> &mut Self {
        self.register(phase, Some(name), Arc::new(body), args)
    }

    fn register(&mut self, phase: Phase, name: Option<&str>, body: Arc<dyn HookFn>, args: Vec<Value>) -> &mut Self {
        let hook = self.make_hook(phase, name, body, args);
        match phase {
            Phase::Initially => self.initially.insert(hook),
            Phase::Before => self.before.insert(hook),
            Phase::Main => self.main.insert(hook),
            Phase::After => self.after.insert(hook),
            Phase::Finally => self.finally.insert(hook),
            Phase::AndThen => self.last_filled().append(hook),
        }
        self
    }

    fn make_hook(&mut self, phase: Phase, name: Option<&str>, body: Arc<dyn HookFn>, args: Vec<Value>) -> Hook {
        self.registered += 1;
        let hook_ctx = HookContext {
            chain_id: self.id,
            options: Arc::clone(&self.options),
            control: self.control.clone(),
        };
        let label = match name {
            Some(name) => format!("{}#{}", name, self.registered),
            None => format!("{}#{}", phase, self.registered),
        };
        Hook::new(phase, label, body, Arc::clone(&self.context))
            .with_args(args)
            .with_hook_context(hook_ctx)
    }

    fn last_filled(&mut self) -> &mut dyn HookBucket<Hook> {
        if !self.finally.is_empty() {
            &mut self.finally
        } else if !self.after.is_empty() {
            &mut self.after
        } else if !self.main.is_empty() {
            &mut self.main
        } else if !self.before.is_empty() {
            &mut self.before
        } else {
            &mut self.initially
        }
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    /// Hooks in the order [`exec`](Self::exec) would run them, finally last.
    pub fn plan(&self) -> Vec<HookRef> {
        self.initially
            .iter()
            .chain(self.before.iter())
            .chain(self.main.iter())
            .chain(self.after.iter())
            .chain(self.finally.iter())
            .map(Hook::reference)
            .collect()
    }

    /// Run the chain and return its yield.
    ///
    /// Meant to be called once: buckets are drained, so a second call runs
    /// nothing and returns the same yield.
    #[instrument(skip(self), fields(chain_id = %self.id, kind = %self.kind))]
    pub async fn exec(&mut self) -> Yield {
        let mut pipeline: Vec<Hook> = Vec::new();
        pipeline.extend(self.initially.drain());
        pipeline.extend(self.before.drain());
        pipeline.extend(self.main.drain());
        pipeline.extend(self.after.drain());

        info!(
            "executing {} hooks, then {} finally hooks",
            pipeline.len(),
            self.finally.len()
        );

        self.run_hooks(&mut pipeline, Pass::Pipeline).await;
        if self.duration.is_none() {
            self.duration = Some(self.started.elapsed());
        }

        let mut finally: Vec<Hook> = self.finally.drain().collect();
        self.run_hooks(&mut finally, Pass::Finally).await;
        self.control.reset();

        self.executed.extend(pipeline);
        self.executed.extend(finally);
        self.yielded.errors = self.errors.clone();

        if self.yielded.success {
            info!("chain completed in {:?}", self.duration.unwrap_or_default());
        } else {
            warn!(
                "chain completed in {:?} with {} error(s)",
                self.duration.unwrap_or_default(),
                self.errors.len()
            );
        }
        self.yielded.clone()
    }

    async fn run_hooks(&mut self, hooks: &mut [Hook], pass: Pass) {
        for hook in hooks.iter_mut() {
            self.current_hook = Some(hook.reference());
            hook.call(Vec::new()).await;

            let mut halt = false;
            if let Some(error) = hook.error().cloned() {
                self.errors.push(error.clone());
                match hook.settle().await {
                    Ok(()) => info!("hook '{}' recovered after {} calls", hook.label(), hook.call_count()),
                    Err(raw) => {
                        self.yielded.success = false;
                        self.context.report(&self.kind, &error, &raw);
                        halt = pass == Pass::Pipeline && self.should_break;
                    }
                }
            }

            if pass == Pass::Pipeline {
                if hook.success() {
                    self.yielded.data = hook.result().cloned();
                }
                if halt {
                    warn!("hook '{}' failed, skipping to finally hooks", hook.label());
                    break;
                }
                if self.control.skips_to_finally() {
                    info!("hook '{}' requested skip to finally hooks", hook.label());
                    break;
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn options(&self) -> &ChainOptions {
        &self.options
    }

    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Control switches shared with every hook body of this chain.
    pub fn control(&self) -> &ChainControl {
        &self.control
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time from construction to the end of the non-finally hooks; `None`
    /// until the chain has run.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn should_break(&self) -> bool {
        self.should_break
    }

    pub fn errors(&self) -> &[HookError] {
        &self.errors
    }

    pub fn yielded(&self) -> &Yield {
        &self.yielded
    }

    /// The hook executing now, or the last one that ran.
    pub fn current_hook(&self) -> Option<&HookRef> {
        self.current_hook.as_ref()
    }

    /// Hooks drained by `exec`, in execution order; skipped hooks are
    /// included with `called() == false`.
    pub fn hooks(&self) -> &[Hook] {
        &self.executed
    }

    /// Hooks still waiting in `phase`'s bucket. `AndThen` has no bucket of
    /// its own, so it always reports zero.
    pub fn pending(&self, phase: Phase) -> usize {
        match phase {
            Phase::Initially => self.initially.len(),
            Phase::Before => self.before.len(),
            Phase::Main => self.main.len(),
            Phase::After => self.after.len(),
            Phase::Finally => self.finally.len(),
            Phase::AndThen => 0,
        }
    }
}
