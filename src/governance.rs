//! Governance decision ledger
//!
//! An append-only record of role-based organizational approvals. Decisions
//! are write-once: there is no update or delete surface, and correcting a
//! decision means recording a new one (typically an `override` action against
//! the same subject). Persisted as a JSON-lines file, one decision per line,
//! appended on every record.

use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// What kind of call the role made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    Approve,
    Deny,
    Override,
    Flag,
}

/// One recorded decision
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceDecision {
    pub id: Uuid,
    pub subject_type: String,
    pub subject_id: String,
    /// Organizational authority identifier (e.g. "operator", "authority")
    pub role: String,
    pub action: DecisionAction,
    pub reason: Option<String>,
    pub is_final: bool,
    pub created_at: DateTime<Utc>,
}

/// Payload for recording a new decision
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDecision {
    pub subject_type: String,
    pub subject_id: String,
    pub role: String,
    pub action: DecisionAction,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}

/// The append-only ledger
pub struct GovernanceLedger {
    path: PathBuf,
    decisions: Mutex<Vec<GovernanceDecision>>,
}

impl GovernanceLedger {
    /// Open the ledger, replaying the persisted lines. Unparsable lines are
    /// skipped with a warning rather than taking the ledger down.
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join("governance_decisions.jsonl");
        let mut decisions = Vec::new();
        if let Ok(raw) = std::fs::read_to_string(&path) {
            for line in raw.lines().filter(|l| !l.trim().is_empty()) {
                match serde_json::from_str::<GovernanceDecision>(line) {
                    Ok(d) => decisions.push(d),
                    Err(e) => warn!("Skipping unparsable ledger line: {}", e),
                }
            }
        }
        Self {
            path,
            decisions: Mutex::new(decisions),
        }
    }

    /// Append a decision (pure append; nothing is ever rewritten)
    pub async fn record_decision(&self, payload: NewDecision) -> Result<GovernanceDecision, AppError> {
        if payload.subject_type.trim().is_empty() || payload.role.trim().is_empty() {
            return Err(AppError::Validation(
                "subject_type and role are required".to_string(),
            ));
        }

        let decision = GovernanceDecision {
            id: Uuid::new_v4(),
            subject_type: payload.subject_type.trim().to_lowercase(),
            subject_id: payload.subject_id.trim().to_string(),
            role: payload.role.trim().to_string(),
            action: payload.action,
            reason: payload.reason,
            is_final: payload.is_final,
            created_at: Utc::now(),
        };

        let mut decisions = self.decisions.lock().await;
        self.append_line(&decision)
            .map_err(|e| AppError::Storage(format!("Failed to append decision: {}", e)))?;
        decisions.push(decision.clone());

        info!(
            "Governance decision recorded: {} {:?} on {}/{} (final={})",
            decision.role, decision.action, decision.subject_type, decision.subject_id, decision.is_final
        );
        Ok(decision)
    }

    fn append_line(&self, decision: &GovernanceDecision) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let line = format!("{}\n", serde_json::to_string(decision)?);
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| f.write_all(line.as_bytes()))
    }

    /// Fetch one decision by id
    pub async fn get(&self, id: Uuid) -> Option<GovernanceDecision> {
        self.decisions.lock().await.iter().find(|d| d.id == id).cloned()
    }

    /// All decisions for a subject, oldest first
    pub async fn list_for_subject(&self, subject_type: &str, subject_id: &str) -> Vec<GovernanceDecision> {
        let subject_type = subject_type.to_lowercase();
        let decisions = self.decisions.lock().await;
        decisions
            .iter()
            .filter(|d| d.subject_type == subject_type && d.subject_id == subject_id)
            .cloned()
            .collect()
    }

    /// Most recent final decision for a subject, if any
    pub async fn latest_final(&self, subject_type: &str, subject_id: &str) -> Option<GovernanceDecision> {
        let subject_type = subject_type.to_lowercase();
        let decisions = self.decisions.lock().await;
        decisions
            .iter()
            .rev()
            .find(|d| d.is_final && d.subject_type == subject_type && d.subject_id == subject_id)
            .cloned()
    }

    /// All decisions by a role, oldest first
    pub async fn list_by_role(&self, role: &str) -> Vec<GovernanceDecision> {
        let decisions = self.decisions.lock().await;
        decisions.iter().filter(|d| d.role == role).cloned().collect()
    }

    /// Total ledger length
    pub async fn count(&self) -> usize {
        self.decisions.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(role: &str, action: DecisionAction, is_final: bool) -> NewDecision {
        NewDecision {
            subject_type: "deal".to_string(),
            subject_id: "42".to_string(),
            role: role.to_string(),
            action,
            reason: None,
            is_final,
        }
    }

    #[tokio::test]
    async fn decisions_append_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = GovernanceLedger::open(dir.path());
        ledger.record_decision(payload("operator", DecisionAction::Flag, false)).await.unwrap();
        ledger.record_decision(payload("authority", DecisionAction::Approve, true)).await.unwrap();

        let for_subject = ledger.list_for_subject("deal", "42").await;
        assert_eq!(for_subject.len(), 2);
        assert_eq!(for_subject[0].role, "operator");
        assert_eq!(for_subject[1].role, "authority");
    }

    #[tokio::test]
    async fn latest_final_skips_non_final() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = GovernanceLedger::open(dir.path());
        ledger.record_decision(payload("authority", DecisionAction::Approve, true)).await.unwrap();
        ledger.record_decision(payload("operator", DecisionAction::Flag, false)).await.unwrap();

        let latest = ledger.latest_final("deal", "42").await.unwrap();
        assert_eq!(latest.role, "authority");
        assert!(latest.is_final);
    }

    #[tokio::test]
    async fn by_role_filters() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = GovernanceLedger::open(dir.path());
        ledger.record_decision(payload("operator", DecisionAction::Deny, false)).await.unwrap();
        ledger.record_decision(payload("authority", DecisionAction::Approve, true)).await.unwrap();

        assert_eq!(ledger.list_by_role("operator").await.len(), 1);
        assert_eq!(ledger.list_by_role("nobody").await.len(), 0);
    }

    #[tokio::test]
    async fn ledger_survives_reopen_and_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        {
            let ledger = GovernanceLedger::open(dir.path());
            ledger.record_decision(payload("authority", DecisionAction::Approve, true)).await.unwrap();
        }
        // A torn trailing line must not lose the earlier decisions.
        std::fs::OpenOptions::new()
            .append(true)
            .open(dir.path().join("governance_decisions.jsonl"))
            .and_then(|mut f| f.write_all(b"{torn"))
            .unwrap();

        let reopened = GovernanceLedger::open(dir.path());
        assert_eq!(reopened.count().await, 1);
    }

    #[tokio::test]
    async fn subject_type_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = GovernanceLedger::open(dir.path());
        let mut p = payload("authority", DecisionAction::Approve, true);
        p.subject_type = "DEAL".to_string();
        ledger.record_decision(p).await.unwrap();
        assert_eq!(ledger.list_for_subject("deal", "42").await.len(), 1);
    }
}
