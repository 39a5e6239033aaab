//! Core domain models for the chain engine.
//!
//! Phases name where a hook was registered, `HookRef` identifies a hook
//! without owning it, and `Yield` is what a finished run hands back.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HookError;

/// Free-form chain configuration, copied verbatim and never validated.
pub type ChainOptions = Map<String, Value>;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The stage a hook was registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Initially,
    Before,
    Main,
    After,
    Finally,
    /// Appended to whichever phase was most recently filled.
    AndThen,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Initially => "initially",
            Phase::Before => "before",
            Phase::Main => "main",
            Phase::After => "after",
            Phase::Finally => "finally",
            Phase::AndThen => "andThen",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// HookRef
// ---------------------------------------------------------------------------

/// Non-owning identity of a hook, used for diagnostics and introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookRef {
    pub phase: Phase,
    /// Unique within its chain, e.g. `main#3`.
    pub label: String,
}

impl fmt::Display for HookRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

// ---------------------------------------------------------------------------
// Yield
// ---------------------------------------------------------------------------

/// The externally observed result of a chain run.
#[derive(Debug, Clone, Serialize)]
pub struct Yield {
    /// False once any hook failed without recovering.
    pub success: bool,
    /// Result of the last successful non-finally hook.
    pub data: Option<Value>,
    /// Every error captured during the run, in order.
    pub errors: Vec<HookError>,
}

impl Default for Yield {
    fn default() -> Self {
        Self {
            success: true,
            data: None,
            errors: Vec::new(),
        }
    }
}
