//! Transition service
//!
//! Orchestrates a requested transition end to end: read current states,
//! evaluate the policy gates, and only then hand the move to the authority.
//! This is the only layer permitted to turn a not-ok policy result into a
//! thrown `TransitionDenied`; below here, policy failures are plain data.

use crate::engine::authority::TransitionAuthority;
use crate::engine::states::{can_transition, EngineState};
use crate::engine::store::EngineStateStore;
use crate::error::AppError;
use crate::governance::{DecisionAction, GovernanceLedger, NewDecision};
use crate::metrics::MetricsStore;
use crate::policy::{evaluate_transition_policy, PolicyResult};
use crate::registry::EngineRegistry;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of an accepted transition
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    pub engine: String,
    pub previous_state: EngineState,
    pub new_state: EngineState,
    /// The policy result that permitted the move (may carry warnings)
    pub policy: PolicyResult,
}

pub struct TransitionService {
    registry: Arc<EngineRegistry>,
    store: Arc<EngineStateStore>,
    metrics: Arc<MetricsStore>,
    authority: Arc<TransitionAuthority>,
    ledger: Arc<GovernanceLedger>,
}

impl TransitionService {
    pub fn new(
        registry: Arc<EngineRegistry>,
        store: Arc<EngineStateStore>,
        metrics: Arc<MetricsStore>,
        authority: Arc<TransitionAuthority>,
        ledger: Arc<GovernanceLedger>,
    ) -> Self {
        Self {
            registry,
            store,
            metrics,
            authority,
            ledger,
        }
    }

    /// Evaluate the policy for a proposed transition without applying it
    pub async fn evaluate(
        &self,
        engine_name: &str,
        target: EngineState,
    ) -> Result<PolicyResult, AppError> {
        let descriptor = self.registry.get(engine_name).ok_or_else(|| {
            AppError::TransitionDenied(format!("Unknown engine '{}': not in the registry", engine_name))
        })?;

        let current_states = self.store.all_states().await;
        let metrics = self.metrics.get().await;
        Ok(evaluate_transition_policy(
            &self.registry,
            descriptor,
            target,
            &current_states,
            &metrics,
        ))
    }

    /// Run the full pipeline: policy, authority, persistence, audit.
    pub async fn transition(
        &self,
        engine_name: &str,
        target: EngineState,
    ) -> Result<TransitionOutcome, AppError> {
        let previous_state = self.authority.get_state(engine_name).await?;

        // Step legality first: an illegal skip is answered with the attempted
        // and current states, not with whatever policy blockers also exist.
        if !can_transition(previous_state, target) {
            return Err(AppError::TransitionDenied(format!(
                "Engine '{}' may not move {} -> {}: only single-step promotion is legal",
                engine_name, previous_state, target
            )));
        }

        let policy = self.evaluate(engine_name, target).await?;

        if !policy.ok {
            warn!(
                engine = engine_name,
                target = %target,
                "Transition blocked by policy: {}",
                policy.blockers_detail()
            );
            return Err(AppError::TransitionDenied(format!(
                "Policy blocked '{}' -> {}: {}",
                engine_name,
                target,
                policy.blockers_detail()
            )));
        }

        let new_state = self.authority.transition(engine_name, target).await?;

        // Every accepted transition leaves a ledger entry; the decision trail
        // is how operators reconstruct who moved what, when, and why.
        let audit = self
            .ledger
            .record_decision(NewDecision {
                subject_type: "engine".to_string(),
                subject_id: engine_name.to_string(),
                role: "authority".to_string(),
                action: DecisionAction::Approve,
                reason: Some(format!("transition {} -> {}", previous_state, new_state)),
                is_final: true,
            })
            .await;
        if let Err(e) = audit {
            // The transition itself is already durable; a ledger write failure
            // is loud but not a rollback.
            warn!("Failed to record transition audit decision: {}", e);
        }

        info!(
            "Engine '{}' promoted {} -> {} ({} warning(s))",
            engine_name,
            previous_state,
            new_state,
            policy.warnings.len()
        );

        Ok(TransitionOutcome {
            engine: engine_name.to_string(),
            previous_state,
            new_state,
            policy,
        })
    }
}
