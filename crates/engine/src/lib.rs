//! `engine` crate: phase buckets, the hook wrapper, the self-handling error
//! taxonomy, and the chain orchestrator that runs it all.

pub mod models;
pub mod bucket;
pub mod error;
pub mod recovery;
pub mod dictionary;
pub mod context;
pub mod config;
pub mod hook;
pub mod chain;

pub use models::{ChainOptions, HookRef, Phase, Yield};
pub use bucket::{HookBucket, Queue, Stack};
pub use error::{EngineError, HookError};
pub use recovery::{FailFast, RecoveryPolicy, Tentative};
pub use dictionary::ErrorDictionary;
pub use context::{Context, FailureSink, TracingSink};
pub use config::{ChainConfig, ErrorTableConfig, TentativeConfig};
pub use hook::Hook;
pub use chain::Chain;
