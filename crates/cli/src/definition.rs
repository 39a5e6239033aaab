//! JSON chain definitions with simulated hook bodies.
//!
//! ```json
//! {
//!   "config": { "name": "Checkout", "should_break": true },
//!   "hooks": [
//!     { "name": "reserve", "phase": "main",
//!       "behaviour": { "type": "return_value", "value": { "ok": true } } }
//!   ]
//! }
//! ```

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use engine::{Chain, ChainConfig, EngineError, Phase};
use hooks::mock::{MockBehaviour, MockHook};

#[derive(Debug, Clone, Deserialize)]
pub struct ChainDefinition {
    #[serde(default)]
    pub config: ChainConfig,
    pub hooks: Vec<HookDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HookDefinition {
    pub name: String,
    pub phase: Phase,
    pub behaviour: MockBehaviour,
    /// Fixed arguments bound at registration.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Simulated latency.
    #[serde(default)]
    pub delay_ms: Option<u64>,
}

impl ChainDefinition {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Register every hook, in definition order, on a chain built from `config`.
    pub fn build(self) -> Result<Chain, EngineError> {
        let mut chain = Chain::from_config(self.config)?;
        for def in self.hooks {
            let mut body = MockHook::new(def.name.clone(), def.behaviour);
            if let Some(ms) = def.delay_ms {
                body = body.with_delay(Duration::from_millis(ms));
            }
            chain.named_hook(def.phase, &def.name, body, def.args);
        }
        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHECKOUT: &str = include_str!("../chains/checkout.json");

    #[test]
    fn bundled_definition_parses_and_plans() {
        let chain = ChainDefinition::from_json(CHECKOUT).unwrap().build().unwrap();
        let phases: Vec<Phase> = chain.plan().into_iter().map(|r| r.phase).collect();
        assert_eq!(
            phases,
            vec![Phase::Initially, Phase::Before, Phase::Main, Phase::AndThen, Phase::After, Phase::Finally]
        );
        assert_eq!(chain.kind(), "Checkout");
    }

    #[test]
    fn plan_labels_use_definition_names() {
        let chain = ChainDefinition::from_json(CHECKOUT).unwrap().build().unwrap();
        let labels: Vec<String> = chain.plan().into_iter().map(|r| r.label).collect();
        assert_eq!(
            labels,
            vec!["load-cart#1", "authorize#2", "charge#3", "email-receipt#4", "ship#5", "release-locks#6"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn bundled_definition_recovers_from_its_transient_failure() {
        let mut chain = ChainDefinition::from_json(CHECKOUT).unwrap().build().unwrap();
        let yielded = chain.exec().await;
        assert!(yielded.success);
        assert_eq!(yielded.errors.len(), 1);
        assert_eq!(yielded.errors[0].key(), "ECONNRESET");
    }

    #[test]
    fn unknown_phase_is_rejected() {
        let json = r#"{ "hooks": [ { "name": "x", "phase": "sometime", "behaviour": { "type": "skip_to_finally" } } ] }"#;
        assert!(matches!(ChainDefinition::from_json(json), Err(EngineError::Config(_))));
    }
}
