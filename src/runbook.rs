//! Runbook status
//!
//! The operator's one-page answer to "is it safe to run?". Aggregates the
//! kill switch, the gate evaluations over live inputs, and every engine's
//! current state. This surface must never fail: any internal error degrades
//! to an explicit `ok: false` payload with the error as a blocker, because a
//! status endpoint that 500s is a status endpoint that lies by omission.

use crate::engine::states::EngineState;
use crate::engine::store::EngineStateStore;
use crate::guard::KillSwitch;
use crate::metrics::{MetricsStore, SystemMetrics};
use crate::policy::{gates, PolicyResult};
use crate::quarantine::QuarantineStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Aggregated runbook payload
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunbookStatus {
    pub ok: bool,
    pub blockers: Vec<String>,
    pub warnings: Vec<String>,
    pub metrics: SystemMetrics,
    pub engine_states: HashMap<String, EngineState>,
    pub kill_switch_engaged: bool,
    pub generated_at: DateTime<Utc>,
}

pub struct RunbookService {
    engine_store: Arc<EngineStateStore>,
    metrics: Arc<MetricsStore>,
    quarantine: Arc<QuarantineStore>,
    kill_switch: Arc<KillSwitch>,
}

impl RunbookService {
    pub fn new(
        engine_store: Arc<EngineStateStore>,
        metrics: Arc<MetricsStore>,
        quarantine: Arc<QuarantineStore>,
        kill_switch: Arc<KillSwitch>,
    ) -> Self {
        Self {
            engine_store,
            metrics,
            quarantine,
            kill_switch,
        }
    }

    /// Build the runbook. Never fails; see module docs.
    pub async fn build(&self) -> RunbookStatus {
        match self.build_impl().await {
            Ok(status) => status,
            Err(e) => RunbookStatus {
                ok: false,
                blockers: vec![format!("runbook evaluation error: {}", e)],
                warnings: Vec::new(),
                metrics: SystemMetrics::default(),
                engine_states: HashMap::new(),
                kill_switch_engaged: true,
                generated_at: Utc::now(),
            },
        }
    }

    async fn build_impl(&self) -> Result<RunbookStatus, crate::error::AppError> {
        let metrics = self.metrics.get().await;
        let engine_states = self.engine_store.all_states().await;
        let kill_switch_engaged = self.kill_switch.is_engaged();

        let mut result = PolicyResult::pass();
        if kill_switch_engaged {
            result.merge(PolicyResult::from_reasons(
                vec!["Kill switch is engaged; all effectful execution is blocked".to_string()],
                Vec::new(),
            ));
        }

        result.merge(gates::survival_gate(
            metrics.monthly_net_cad,
            metrics.monthly_burn_cad,
            metrics.critical_runbook_blockers,
        ));

        // The purity gate runs over the live backlog, not the hand-entered
        // metric, so the runbook reflects what the store actually holds.
        let live_backlog = self.quarantine.backlog().await;
        result.merge(gates::data_purity_gate(live_backlog, metrics.clean_promotion_enabled));

        result.merge(gates::closed_loop_learning_gate(
            metrics.outcomes_required_ratio,
            metrics.outcomes_recorded_ratio,
        ));

        Ok(RunbookStatus {
            ok: result.ok,
            blockers: result.blockers,
            warnings: result.warnings,
            metrics,
            engine_states,
            kill_switch_engaged,
            generated_at: Utc::now(),
        })
    }
}

/// Render a runbook as a markdown checklist
pub fn render_markdown(status: &RunbookStatus) -> String {
    let mut md = String::new();
    md.push_str(&format!(
        "# Go-Live Runbook\n\nGenerated: `{}`\nOverall: {}\n\n",
        status.generated_at.to_rfc3339(),
        if status.ok { "OK" } else { "BLOCKED" }
    ));

    md.push_str("## Blockers\n");
    if status.blockers.is_empty() {
        md.push_str("- none\n");
    } else {
        for b in &status.blockers {
            md.push_str(&format!("- [!] {}\n", b));
        }
    }

    md.push_str("\n## Warnings\n");
    if status.warnings.is_empty() {
        md.push_str("- none\n");
    } else {
        for w in &status.warnings {
            md.push_str(&format!("- [~] {}\n", w));
        }
    }

    md.push_str("\n## Engine States\n");
    let mut engines: Vec<_> = status.engine_states.iter().collect();
    engines.sort_by(|a, b| a.0.cmp(b.0));
    for (name, state) in engines {
        md.push_str(&format!("- {}: {}\n", name, state));
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quarantine::UpsertIntakeItem;
    use crate::registry::{EngineDescriptor, EngineRegistry};

    struct Fixture {
        _dir: tempfile::TempDir,
        service: RunbookService,
        metrics: Arc<MetricsStore>,
        quarantine: Arc<QuarantineStore>,
        kill_switch: Arc<KillSwitch>,
    }

    fn setup() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = EngineRegistry::with_engines(vec![EngineDescriptor {
            name: "a".to_string(),
            layer: 1,
            initial_state: EngineState::Sandbox,
            allows_real_world_effects: false,
            capital_domain: None,
        }]);
        let engine_store = Arc::new(EngineStateStore::open(dir.path(), &registry));
        let metrics = Arc::new(MetricsStore::open(dir.path()));
        let quarantine = Arc::new(QuarantineStore::open(dir.path()));
        let kill_switch = Arc::new(KillSwitch::new(false));
        let service = RunbookService::new(
            engine_store,
            metrics.clone(),
            quarantine.clone(),
            kill_switch.clone(),
        );
        Fixture {
            _dir: dir,
            service,
            metrics,
            quarantine,
            kill_switch,
        }
    }

    #[tokio::test]
    async fn default_metrics_produce_blockers_not_errors() {
        let fx = setup();
        let status = fx.service.build().await;
        assert!(!status.ok);
        assert!(!status.blockers.is_empty());
        assert_eq!(status.engine_states.get("a"), Some(&EngineState::Sandbox));
    }

    #[tokio::test]
    async fn healthy_inputs_produce_ok() {
        let fx = setup();
        fx.metrics
            .set(SystemMetrics {
                monthly_net_cad: 5000.0,
                monthly_burn_cad: 2000.0,
                clean_promotion_enabled: true,
                outcomes_required_ratio: 0.5,
                outcomes_recorded_ratio: 0.9,
                ..SystemMetrics::default()
            })
            .await
            .unwrap();

        let status = fx.service.build().await;
        assert!(status.ok, "unexpected blockers: {:?}", status.blockers);
    }

    #[tokio::test]
    async fn kill_switch_is_a_blocker() {
        let fx = setup();
        fx.kill_switch.set(true);
        let status = fx.service.build().await;
        assert!(!status.ok);
        assert!(status.blockers.iter().any(|b| b.contains("Kill switch")));
        assert!(status.kill_switch_engaged);
    }

    #[tokio::test]
    async fn purity_gate_reads_live_backlog() {
        let fx = setup();
        fx.metrics
            .set(SystemMetrics {
                monthly_net_cad: 5000.0,
                monthly_burn_cad: 2000.0,
                clean_promotion_enabled: true,
                // Stale hand-entered backlog; the live store is what counts.
                quarantine_backlog: 9999,
                ..SystemMetrics::default()
            })
            .await
            .unwrap();
        for i in 0..150 {
            fx.quarantine
                .upsert(UpsertIntakeItem {
                    item_id: format!("item-{}", i),
                    source: "feed".to_string(),
                    entity_type: "lead".to_string(),
                    payload: serde_json::Value::Null,
                    evidence_ref: None,
                })
                .await
                .unwrap();
        }

        let status = fx.service.build().await;
        // 150 live items: warning territory, not a blocker.
        assert!(status.ok, "unexpected blockers: {:?}", status.blockers);
        assert!(status.warnings.iter().any(|w| w.contains("150")));
    }

    #[tokio::test]
    async fn markdown_renders_blockers_and_states() {
        let fx = setup();
        let status = fx.service.build().await;
        let md = render_markdown(&status);
        assert!(md.contains("# Go-Live Runbook"));
        assert!(md.contains("## Blockers"));
        assert!(md.contains("a: SANDBOX"));
    }
}
