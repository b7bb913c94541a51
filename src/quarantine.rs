//! Intake quarantine and trust promotion
//!
//! Freshly ingested data is untrusted by default: every intake item starts in
//! QUARANTINE at trust tier T0. The only way out is an explicit, guarded
//! promotion to CLEAN or a guarded rejection; there is no bulk or implicit
//! path. Both escapes require the item to be exactly in QUARANTINE, which
//! makes re-promotion a hard 409 rather than a silent no-op.

use crate::engine::store::write_json_atomic;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// How much the data can be trusted, T0 (none) through T4 (verified)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrustTier {
    T0,
    T1,
    T2,
    T3,
    T4,
}

impl TrustTier {
    /// Parse a tier from its wire spelling, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T0" => Some(TrustTier::T0),
            "T1" => Some(TrustTier::T1),
            "T2" => Some(TrustTier::T2),
            "T3" => Some(TrustTier::T3),
            "T4" => Some(TrustTier::T4),
            _ => None,
        }
    }
}

/// Lifecycle status of an intake item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntakeStatus {
    Quarantine,
    Clean,
    Rejected,
}

impl std::fmt::Display for IntakeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntakeStatus::Quarantine => "QUARANTINE",
            IntakeStatus::Clean => "CLEAN",
            IntakeStatus::Rejected => "REJECTED",
        };
        f.write_str(s)
    }
}

/// One unit of raw intake
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeItem {
    pub item_id: String,
    pub source: String,
    pub entity_type: String,
    /// Opaque payload; any JSON shape is accepted and carried untouched
    pub payload: serde_json::Value,
    pub trust_tier: TrustTier,
    pub status: IntakeStatus,
    pub evidence_ref: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating or updating an item
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertIntakeItem {
    pub item_id: String,
    pub source: String,
    pub entity_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub evidence_ref: Option<String>,
}

/// File-backed quarantine store; sole owner of intake items
pub struct QuarantineStore {
    path: PathBuf,
    items: Mutex<HashMap<String, IntakeItem>>,
}

impl QuarantineStore {
    /// Open the store. Missing or corrupt content starts empty; quarantine
    /// data is re-ingestable and an empty store blocks nothing incorrectly
    /// (an empty backlog is the permissive direction for the purity gate,
    /// but items themselves always start untrusted).
    pub fn open(data_dir: &Path) -> Self {
        let path = data_dir.join("quarantine_items.json");
        let items = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(items) => items,
                Err(e) => {
                    warn!("Corrupt quarantine file {:?}, starting empty: {}", path, e);
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            items: Mutex::new(items),
        }
    }

    /// Create or update an item. New items enter QUARANTINE at T0;
    /// `created_at` is stamped once and survives later upserts, as do status
    /// and trust tier (upsert refreshes the data, never the trust).
    pub async fn upsert(&self, payload: UpsertIntakeItem) -> Result<IntakeItem, AppError> {
        let item_id = payload.item_id.trim().to_string();
        if item_id.is_empty() {
            return Err(AppError::Validation("item_id is required".to_string()));
        }

        let mut items = self.items.lock().await;
        let item = match items.get(&item_id) {
            Some(existing) => IntakeItem {
                item_id: item_id.clone(),
                source: payload.source.trim().to_lowercase(),
                entity_type: payload.entity_type.trim().to_lowercase(),
                payload: payload.payload,
                trust_tier: existing.trust_tier,
                status: existing.status,
                evidence_ref: payload.evidence_ref.or_else(|| existing.evidence_ref.clone()),
                rejection_reason: existing.rejection_reason.clone(),
                created_at: existing.created_at,
            },
            None => IntakeItem {
                item_id: item_id.clone(),
                source: payload.source.trim().to_lowercase(),
                entity_type: payload.entity_type.trim().to_lowercase(),
                payload: payload.payload,
                trust_tier: TrustTier::T0,
                status: IntakeStatus::Quarantine,
                evidence_ref: payload.evidence_ref,
                rejection_reason: None,
                created_at: Utc::now(),
            },
        };

        Self::commit(&self.path, &mut items, item)
    }

    /// Promote a quarantined item to CLEAN at the given tier.
    /// The single allowed escape from quarantine.
    pub async fn promote_to_clean(&self, item_id: &str, trust_tier: TrustTier) -> Result<IntakeItem, AppError> {
        let mut items = self.items.lock().await;
        let item = Self::require_quarantined(&items, item_id, "PROMOTE_TO_CLEAN")?;

        let updated = IntakeItem {
            status: IntakeStatus::Clean,
            trust_tier,
            ..item
        };
        let promoted = Self::commit(&self.path, &mut items, updated)?;
        info!("Intake item '{}' promoted to CLEAN at {:?}", item_id, trust_tier);
        Ok(promoted)
    }

    /// Reject a quarantined item. Same precondition as promotion: only a
    /// QUARANTINE item can be rejected, and the reason is recorded.
    pub async fn reject(&self, item_id: &str, reason: &str) -> Result<IntakeItem, AppError> {
        let mut items = self.items.lock().await;
        let item = Self::require_quarantined(&items, item_id, "REJECT")?;

        let updated = IntakeItem {
            status: IntakeStatus::Rejected,
            rejection_reason: Some(reason.to_string()),
            ..item
        };
        let rejected = Self::commit(&self.path, &mut items, updated)?;
        info!("Intake item '{}' rejected: {}", item_id, reason);
        Ok(rejected)
    }

    fn require_quarantined(
        items: &HashMap<String, IntakeItem>,
        item_id: &str,
        action: &str,
    ) -> Result<IntakeItem, AppError> {
        let item = items.get(item_id).ok_or_else(|| AppError::EngineBlocked {
            engine: "intake".to_string(),
            action: action.to_string(),
            state: "MISSING".to_string(),
            reason: format!("Intake item '{}' does not exist", item_id),
        })?;

        if item.status != IntakeStatus::Quarantine {
            return Err(AppError::EngineBlocked {
                engine: "intake".to_string(),
                action: action.to_string(),
                state: item.status.to_string(),
                reason: format!("Intake item '{}' is not in QUARANTINE", item_id),
            });
        }
        Ok(item.clone())
    }

    /// Persist a candidate map carrying `item`, then commit it to memory.
    /// Order matters: a persist failure must leave memory exactly as durable
    /// state has it, so the caller can retry.
    fn commit(
        path: &Path,
        items: &mut HashMap<String, IntakeItem>,
        item: IntakeItem,
    ) -> Result<IntakeItem, AppError> {
        let mut next = items.clone();
        next.insert(item.item_id.clone(), item.clone());
        write_json_atomic(path, &next)
            .map_err(|e| AppError::Storage(format!("Failed to persist quarantine items: {}", e)))?;
        *items = next;
        Ok(item)
    }

    /// Fetch one item
    pub async fn get(&self, item_id: &str) -> Option<IntakeItem> {
        self.items.lock().await.get(item_id).cloned()
    }

    /// List items, optionally filtered by status, oldest first
    pub async fn list(&self, status: Option<IntakeStatus>) -> Vec<IntakeItem> {
        let items = self.items.lock().await;
        let mut listed: Vec<_> = items
            .values()
            .filter(|i| status.map_or(true, |s| i.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        listed
    }

    /// Number of items still in QUARANTINE; feeds the data purity gate
    pub async fn backlog(&self) -> u64 {
        let items = self.items.lock().await;
        items.values().filter(|i| i.status == IntakeStatus::Quarantine).count() as u64
    }
}
