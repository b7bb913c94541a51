//! Policy gates
//!
//! Each gate is a pure function over explicit inputs producing a
//! `PolicyResult`. Gates never reach into global state; whoever calls them
//! (the policy engine, the runbook) gathers the inputs first. Every ambiguous
//! or invalid input resolves to a blocker.

use crate::engine::states::EngineState;
use crate::policy::result::PolicyResult;
use crate::registry::{EngineDescriptor, EngineRegistry, ADVISORY_ENGINE};
use std::collections::HashMap;

/// Sequencing gate: a higher-layer capability may not outrun its foundation.
///
/// For every other registered engine whose layer is below the candidate's,
/// a current state of DISABLED or DORMANT is a blocker. The forward-looking
/// advisory engine may never be promoted to ACTIVE regardless of inputs; that
/// is a permanent policy carve-out, not a bug.
pub fn sequencing_gate(
    registry: &EngineRegistry,
    engine: &EngineDescriptor,
    target_state: EngineState,
    current_states: &HashMap<String, EngineState>,
) -> PolicyResult {
    let mut blockers = Vec::new();

    if engine.name == ADVISORY_ENGINE && target_state == EngineState::Active {
        blockers.push(format!(
            "Engine '{}' is advisory-only and may never be promoted to ACTIVE",
            engine.name
        ));
    }

    for other in registry.list() {
        if other.name == engine.name || other.layer >= engine.layer {
            continue;
        }
        // Missing entries fail closed: treat as DISABLED.
        let state = current_states
            .get(&other.name)
            .copied()
            .unwrap_or(EngineState::Disabled);
        if matches!(state, EngineState::Disabled | EngineState::Dormant) {
            blockers.push(format!(
                "Foundation engine '{}' (layer {}) is {} and must be running before '{}' (layer {}) advances",
                other.name, other.layer, state, engine.name, engine.layer
            ));
        }
    }

    PolicyResult::from_reasons(blockers, Vec::new())
}

/// Survival gate: the operation must be financially survivable.
///
/// A non-positive burn figure is invalid input and fails closed.
pub fn survival_gate(monthly_net: f64, monthly_burn: f64, critical_blockers: u32) -> PolicyResult {
    let mut blockers = Vec::new();

    if critical_blockers > 0 {
        blockers.push(format!(
            "{} critical runbook blocker(s) outstanding",
            critical_blockers
        ));
    }
    if monthly_burn <= 0.0 {
        blockers.push(format!(
            "Monthly burn {} is not a valid positive figure; failing closed",
            monthly_burn
        ));
    } else if monthly_net < monthly_burn {
        blockers.push(format!(
            "Survival not proven: monthly net {} is below monthly burn {}",
            monthly_net, monthly_burn
        ));
    }

    PolicyResult::from_reasons(blockers, Vec::new())
}

/// Data purity gate: quarantined intake must not pile up unpromoted.
pub fn data_purity_gate(quarantine_backlog: u64, clean_promotion_enabled: bool) -> PolicyResult {
    let mut blockers = Vec::new();
    let mut warnings = Vec::new();

    if !clean_promotion_enabled {
        blockers.push("Clean promotion is disabled; quarantined data cannot be trusted".to_string());
    }
    if quarantine_backlog > 500 {
        blockers.push(format!(
            "Quarantine backlog {} exceeds the hard limit of 500",
            quarantine_backlog
        ));
    } else if quarantine_backlog > 100 {
        warnings.push(format!(
            "Quarantine backlog {} is elevated (over 100)",
            quarantine_backlog
        ));
    }

    PolicyResult::from_reasons(blockers, warnings)
}

/// Closed-loop learning gate: decisions must be recording their outcomes.
///
/// A non-positive required ratio means the loop is not yet being enforced;
/// the gate passes but says so.
pub fn closed_loop_learning_gate(required_ratio: f64, recorded_ratio: f64) -> PolicyResult {
    if required_ratio <= 0.0 {
        return PolicyResult::from_reasons(
            Vec::new(),
            vec!["Closed-loop learning ratio not enforced (required ratio is zero)".to_string()],
        );
    }

    let mut blockers = Vec::new();
    if recorded_ratio < required_ratio {
        blockers.push(format!(
            "Outcome recording ratio {} is below the required {}",
            recorded_ratio, required_ratio
        ));
    }
    PolicyResult::from_reasons(blockers, Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn two_layer_registry() -> EngineRegistry {
        EngineRegistry::with_engines(vec![
            EngineDescriptor {
                name: "a".to_string(),
                layer: 1,
                initial_state: EngineState::Dormant,
                allows_real_world_effects: false,
                capital_domain: None,
            },
            EngineDescriptor {
                name: "b".to_string(),
                layer: 2,
                initial_state: EngineState::Disabled,
                allows_real_world_effects: true,
                capital_domain: None,
            },
        ])
    }

    #[test]
    fn sequencing_blocks_when_foundation_is_dormant() {
        let registry = two_layer_registry();
        let b = registry.get("b").unwrap().clone();
        let mut states = HashMap::new();
        states.insert("a".to_string(), EngineState::Dormant);
        states.insert("b".to_string(), EngineState::Dormant);

        let result = sequencing_gate(&registry, &b, EngineState::Sandbox, &states);
        assert!(!result.ok);
        assert!(result.blockers[0].contains("'a'"));
        assert!(result.blockers[0].contains("DORMANT"));
    }

    #[test]
    fn sequencing_passes_when_foundation_is_running() {
        let registry = two_layer_registry();
        let b = registry.get("b").unwrap().clone();
        let mut states = HashMap::new();
        states.insert("a".to_string(), EngineState::Sandbox);

        let result = sequencing_gate(&registry, &b, EngineState::Sandbox, &states);
        assert!(result.ok);
    }

    #[test]
    fn sequencing_treats_missing_state_as_disabled() {
        let registry = two_layer_registry();
        let b = registry.get("b").unwrap().clone();
        let states = HashMap::new();

        let result = sequencing_gate(&registry, &b, EngineState::Sandbox, &states);
        assert!(!result.ok);
    }

    #[test]
    fn advisory_engine_can_never_go_active() {
        let registry = EngineRegistry::new();
        let advisory = registry.get(ADVISORY_ENGINE).unwrap().clone();
        let mut states = HashMap::new();
        for e in registry.list() {
            states.insert(e.name.clone(), EngineState::Active);
        }

        let result = sequencing_gate(&registry, &advisory, EngineState::Active, &states);
        assert!(!result.ok);
        assert!(result.blockers[0].contains("advisory-only"));
    }

    #[test]
    fn survival_blocks_when_net_below_burn() {
        let result = survival_gate(1000.0, 2000.0, 0);
        assert!(!result.ok);
        assert!(result.blockers[0].contains("Survival not proven"));
    }

    #[test]
    fn survival_fails_closed_on_invalid_burn() {
        let result = survival_gate(1000.0, 0.0, 0);
        assert!(!result.ok);
        assert!(result.blockers[0].contains("failing closed"));
    }

    #[test]
    fn survival_blocks_on_critical_blockers_even_when_solvent() {
        let result = survival_gate(10_000.0, 2000.0, 3);
        assert!(!result.ok);
    }

    #[test]
    fn survival_passes_when_solvent_and_clear() {
        assert!(survival_gate(5000.0, 2000.0, 0).ok);
    }

    #[test]
    fn data_purity_thresholds() {
        assert!(!data_purity_gate(0, false).ok);
        assert!(!data_purity_gate(501, true).ok);

        let warned = data_purity_gate(250, true);
        assert!(warned.ok);
        assert_eq!(warned.warnings.len(), 1);

        let clean = data_purity_gate(100, true);
        assert!(clean.ok);
        assert!(clean.warnings.is_empty());
    }

    #[test]
    fn closed_loop_noop_warns_when_unenforced() {
        let result = closed_loop_learning_gate(0.0, 0.0);
        assert!(result.ok);
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn closed_loop_blocks_when_ratio_short() {
        assert!(!closed_loop_learning_gate(0.8, 0.5).ok);
        assert!(closed_loop_learning_gate(0.8, 0.8).ok);
    }
}
