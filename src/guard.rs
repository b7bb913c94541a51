//! Runtime guard
//!
//! The enforcement point called as the first statement of every code path
//! that can cause a real-world effect. Enforcement happens before the effect,
//! not merely before a transition: an ACTIVE engine demoted a millisecond ago
//! is blocked at its next call site.
//!
//! Check order is fixed: kill switch, registry membership, engine state,
//! action class. DISABLED and DORMANT block every action including read-only
//! ones; a dormant engine running "harmless" code is still uncertified code
//! running. SANDBOX blocks exactly the effectful actions.

use crate::engine::store::EngineStateStore;
use crate::engine::states::EngineState;
use crate::error::AppError;
use crate::registry::{EngineAction, EngineRegistry};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

/// Process-wide kill switch. Engaged means every enforcement call blocks,
/// regardless of engine or state.
pub struct KillSwitch {
    engaged: AtomicBool,
}

impl KillSwitch {
    pub fn new(engaged: bool) -> Self {
        Self {
            engaged: AtomicBool::new(engaged),
        }
    }

    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::SeqCst)
    }

    pub fn set(&self, engaged: bool) {
        self.engaged.store(engaged, Ordering::SeqCst);
        if engaged {
            warn!("Kill switch ENGAGED: all effectful execution is blocked");
        } else {
            warn!("Kill switch disengaged");
        }
    }
}

pub struct RuntimeGuard {
    registry: Arc<EngineRegistry>,
    store: Arc<EngineStateStore>,
    kill_switch: Arc<KillSwitch>,
}

impl RuntimeGuard {
    pub fn new(
        registry: Arc<EngineRegistry>,
        store: Arc<EngineStateStore>,
        kill_switch: Arc<KillSwitch>,
    ) -> Self {
        Self {
            registry,
            store,
            kill_switch,
        }
    }

    /// Block or allow one action for one engine, right now.
    ///
    /// Returns the engine's current state on allow so call sites can log it.
    pub async fn enforce(&self, engine_name: &str, action: &EngineAction) -> Result<EngineState, AppError> {
        if self.kill_switch.is_engaged() {
            return Err(self.blocked(engine_name, action, "UNKNOWN", "kill switch engaged"));
        }

        let descriptor = match self.registry.get(engine_name) {
            Some(d) => d,
            None => {
                return Err(self.blocked(engine_name, action, "UNKNOWN", "engine not in registry"));
            }
        };

        let state = match self.store.get_state(engine_name).await {
            Some(s) => s,
            None => {
                return Err(self.blocked(engine_name, action, "UNKNOWN", "no persisted state"));
            }
        };

        match state {
            EngineState::Disabled | EngineState::Dormant => Err(self.blocked(
                engine_name,
                action,
                &state.to_string(),
                "engine is not running; all actions blocked",
            )),
            EngineState::Sandbox if action.real_world_effect => Err(self.blocked(
                engine_name,
                action,
                "SANDBOX",
                "real-world effects are disabled in sandbox",
            )),
            EngineState::Sandbox => Ok(state),
            EngineState::Active => {
                // An engine that may never cause effects stays harmless even
                // when ACTIVE.
                if action.real_world_effect && !descriptor.allows_real_world_effects {
                    Err(self.blocked(
                        engine_name,
                        action,
                        "ACTIVE",
                        "engine is not certified for real-world effects",
                    ))
                } else {
                    Ok(state)
                }
            }
        }
    }

    fn blocked(&self, engine: &str, action: &EngineAction, state: &str, reason: &str) -> AppError {
        warn!(
            engine = engine,
            action = %action.name,
            state = state,
            "Runtime guard blocked execution: {}",
            reason
        );
        AppError::EngineBlocked {
            engine: engine.to_string(),
            action: action.name.clone(),
            state: state.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EngineDescriptor;

    struct Fixture {
        _dir: tempfile::TempDir,
        guard: RuntimeGuard,
        store: Arc<EngineStateStore>,
        kill_switch: Arc<KillSwitch>,
    }

    fn setup(initial: EngineState) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(EngineRegistry::with_engines(vec![EngineDescriptor {
            name: "wholesaling".to_string(),
            layer: 1,
            initial_state: initial,
            allows_real_world_effects: true,
            capital_domain: Some("real_estate".to_string()),
        }]));
        let store = Arc::new(EngineStateStore::open(dir.path(), &registry));
        let kill_switch = Arc::new(KillSwitch::new(false));
        let guard = RuntimeGuard::new(registry, store.clone(), kill_switch.clone());
        Fixture {
            _dir: dir,
            guard,
            store,
            kill_switch,
        }
    }

    fn effectful() -> EngineAction {
        EngineAction::new("OUTREACH", true)
    }

    fn harmless() -> EngineAction {
        EngineAction::new("COMPUTE", false)
    }

    #[tokio::test]
    async fn guard_matrix() {
        // (state, effectful) -> blocked?
        let cases = [
            (EngineState::Disabled, true, true),
            (EngineState::Disabled, false, true),
            (EngineState::Dormant, true, true),
            (EngineState::Dormant, false, true),
            (EngineState::Sandbox, true, true),
            (EngineState::Sandbox, false, false),
            (EngineState::Active, true, false),
            (EngineState::Active, false, false),
        ];
        for (state, effect, expect_block) in cases {
            let fx = setup(state);
            let action = if effect { effectful() } else { harmless() };
            let result = fx.guard.enforce("wholesaling", &action).await;
            assert_eq!(
                result.is_err(),
                expect_block,
                "state={} effectful={} expected block={}",
                state,
                effect,
                expect_block
            );
        }
    }

    #[tokio::test]
    async fn kill_switch_blocks_everything() {
        let fx = setup(EngineState::Active);
        fx.kill_switch.set(true);
        let err = fx.guard.enforce("wholesaling", &harmless()).await.unwrap_err();
        match err {
            AppError::EngineBlocked { reason, .. } => assert!(reason.contains("kill switch")),
            other => panic!("expected EngineBlocked, got {:?}", other),
        }

        fx.kill_switch.set(false);
        assert!(fx.guard.enforce("wholesaling", &harmless()).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_engine_is_blocked() {
        let fx = setup(EngineState::Active);
        let err = fx.guard.enforce("ghost", &harmless()).await.unwrap_err();
        assert!(matches!(err, AppError::EngineBlocked { .. }));
    }

    #[tokio::test]
    async fn sandbox_blocks_outreach_but_allows_compute() {
        let fx = setup(EngineState::Sandbox);
        assert!(fx.guard.enforce("wholesaling", &effectful()).await.is_err());
        assert!(fx.guard.enforce("wholesaling", &harmless()).await.is_ok());
    }

    #[tokio::test]
    async fn active_but_uncertified_engine_cannot_cause_effects() {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(EngineRegistry::with_engines(vec![EngineDescriptor {
            name: "advisory".to_string(),
            layer: 1,
            initial_state: EngineState::Active,
            allows_real_world_effects: false,
            capital_domain: None,
        }]));
        let store = Arc::new(EngineStateStore::open(dir.path(), &registry));
        let guard = RuntimeGuard::new(registry, store, Arc::new(KillSwitch::new(false)));

        assert!(guard.enforce("advisory", &effectful()).await.is_err());
        assert!(guard.enforce("advisory", &harmless()).await.is_ok());
    }

    #[tokio::test]
    async fn demotion_takes_effect_at_next_call_site() {
        let fx = setup(EngineState::Active);
        assert!(fx.guard.enforce("wholesaling", &effectful()).await.is_ok());
        fx.store.set_state("wholesaling", EngineState::Dormant).await.unwrap();
        assert!(fx.guard.enforce("wholesaling", &effectful()).await.is_err());
    }

    #[tokio::test]
    async fn blocked_error_carries_context() {
        let fx = setup(EngineState::Sandbox);
        match fx.guard.enforce("wholesaling", &effectful()).await.unwrap_err() {
            AppError::EngineBlocked { engine, action, state, reason } => {
                assert_eq!(engine, "wholesaling");
                assert_eq!(action, "OUTREACH");
                assert_eq!(state, "SANDBOX");
                assert!(!reason.is_empty());
            }
            other => panic!("expected EngineBlocked, got {:?}", other),
        }
    }
}
