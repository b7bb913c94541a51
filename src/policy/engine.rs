//! Policy engine
//!
//! Composes the gates for a proposed transition. The sequencing gate always
//! applies. The survival, data-purity and closed-loop gates apply only when
//! the target is operational capability (SANDBOX or ACTIVE): a retreat toward
//! DORMANT or DISABLED must never be blocked by financial or sequencing-of-
//! metrics concerns, because safety retreats must always be possible.

use crate::engine::states::EngineState;
use crate::metrics::SystemMetrics;
use crate::policy::gates;
use crate::policy::result::PolicyResult;
use crate::registry::{EngineDescriptor, EngineRegistry};
use std::collections::HashMap;
use tracing::debug;

/// Evaluate the full gate stack for a proposed transition
pub fn evaluate_transition_policy(
    registry: &EngineRegistry,
    engine: &EngineDescriptor,
    target: EngineState,
    current_states: &HashMap<String, EngineState>,
    metrics: &SystemMetrics,
) -> PolicyResult {
    let mut result = PolicyResult::pass();

    result.merge(gates::sequencing_gate(registry, engine, target, current_states));

    if target.is_operational() {
        result.merge(gates::survival_gate(
            metrics.monthly_net_cad,
            metrics.monthly_burn_cad,
            metrics.critical_runbook_blockers,
        ));
        result.merge(gates::data_purity_gate(
            metrics.quarantine_backlog,
            metrics.clean_promotion_enabled,
        ));
        result.merge(gates::closed_loop_learning_gate(
            metrics.outcomes_required_ratio,
            metrics.outcomes_recorded_ratio,
        ));
    }

    debug!(
        engine = %engine.name,
        target = %target,
        ok = result.ok,
        blockers = result.blockers.len(),
        "Transition policy evaluated"
    );

    result
}
