//! `hooks` crate: the `HookFn` trait and the outcome types hook bodies return.
//!
//! Async closures implement [`HookFn`] directly; synchronous ones go through
//! [`sync_fn`]. The engine wraps each body in a `Hook` and calls it through
//! `Arc<dyn HookFn>`.

pub mod error;
pub mod traits;
pub mod mock;

pub use error::RawError;
pub use traits::{sync_fn, ChainControl, HookArgs, HookContext, HookFn, HookOutcome, HookResult, SyncFn};
