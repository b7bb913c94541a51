//! Transition authority
//!
//! The sole writer of engine state. Enforces the closed world (unknown names
//! are denied, never defaulted) and the single-step promotion rule. Callers
//! are explicit authority-holders (ops endpoints); an engine's own runtime
//! path never gets a handle to this type.

use crate::engine::states::{can_transition, EngineState};
use crate::engine::store::EngineStateStore;
use crate::error::AppError;
use crate::registry::EngineRegistry;
use std::sync::Arc;
use tracing::info;

pub struct TransitionAuthority {
    registry: Arc<EngineRegistry>,
    store: Arc<EngineStateStore>,
}

impl TransitionAuthority {
    pub fn new(registry: Arc<EngineRegistry>, store: Arc<EngineStateStore>) -> Self {
        Self { registry, store }
    }

    /// Current state of a registered engine. Unknown names are denied, not
    /// defaulted: ad hoc engines do not exist.
    pub async fn get_state(&self, engine_name: &str) -> Result<EngineState, AppError> {
        if !self.registry.contains(engine_name) {
            return Err(AppError::TransitionDenied(format!(
                "Unknown engine '{}': not in the registry",
                engine_name
            )));
        }
        // A registered engine always has a snapshot entry; missing means the
        // store was opened against a different registry, which is a denial.
        self.store.get_state(engine_name).await.ok_or_else(|| {
            AppError::TransitionDenied(format!(
                "Engine '{}' has no state in the snapshot",
                engine_name
            ))
        })
    }

    /// Apply a transition if and only if it is the legal single step up.
    /// On denial nothing is mutated.
    ///
    /// The write is a compare-and-set against the state we checked legality
    /// for, so a concurrent transition landing between the read and the write
    /// turns this call into a denial instead of a stale overwrite.
    pub async fn transition(
        &self,
        engine_name: &str,
        target: EngineState,
    ) -> Result<EngineState, AppError> {
        let current = self.get_state(engine_name).await?;

        if !can_transition(current, target) {
            return Err(AppError::TransitionDenied(format!(
                "Engine '{}' may not move {} -> {}: only single-step promotion is legal",
                engine_name, current, target
            )));
        }

        self.store.set_state_if(engine_name, current, target).await?;
        info!("Engine '{}' transitioned {} -> {}", engine_name, current, target);
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EngineDescriptor;
    use pretty_assertions::assert_eq;

    fn setup() -> (tempfile::TempDir, TransitionAuthority) {
        let dir = tempfile::tempdir().unwrap();
        let registry = Arc::new(EngineRegistry::with_engines(vec![EngineDescriptor {
            name: "a".to_string(),
            layer: 1,
            initial_state: EngineState::Dormant,
            allows_real_world_effects: false,
            capital_domain: None,
        }]));
        let store = Arc::new(EngineStateStore::open(dir.path(), &registry));
        (dir, TransitionAuthority::new(registry, store))
    }

    #[tokio::test]
    async fn unknown_engine_is_denied() {
        let (_dir, authority) = setup();
        let err = authority.get_state("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::TransitionDenied(_)));
    }

    #[tokio::test]
    async fn single_step_promotion_succeeds() {
        let (_dir, authority) = setup();
        let state = authority.transition("a", EngineState::Sandbox).await.unwrap();
        assert_eq!(state, EngineState::Sandbox);
        assert_eq!(authority.get_state("a").await.unwrap(), EngineState::Sandbox);
    }

    #[tokio::test]
    async fn skipping_is_denied_and_does_not_mutate() {
        let (_dir, authority) = setup();
        let err = authority.transition("a", EngineState::Active).await.unwrap_err();
        assert!(matches!(err, AppError::TransitionDenied(_)));
        assert_eq!(authority.get_state("a").await.unwrap(), EngineState::Dormant);
    }

    #[tokio::test]
    async fn concurrent_identical_promotions_succeed_exactly_once() {
        let (_dir, authority) = setup();
        let authority = Arc::new(authority);

        let a = {
            let authority = authority.clone();
            tokio::spawn(async move { authority.transition("a", EngineState::Sandbox).await })
        };
        let b = {
            let authority = authority.clone();
            tokio::spawn(async move { authority.transition("a", EngineState::Sandbox).await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "a={:?} b={:?}", a, b);
        assert_eq!(authority.get_state("a").await.unwrap(), EngineState::Sandbox);
    }

    #[tokio::test]
    async fn demotion_is_denied() {
        let (_dir, authority) = setup();
        authority.transition("a", EngineState::Sandbox).await.unwrap();
        let err = authority.transition("a", EngineState::Dormant).await.unwrap_err();
        assert!(matches!(err, AppError::TransitionDenied(_)));
    }
}
