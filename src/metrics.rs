//! System metrics feeding the policy gates
//!
//! A small file-backed store for the handful of numbers the gates and the
//! runbook consume. Defaults are deliberately the most restrictive values:
//! zero net, zero burn (invalid, fails the survival gate) and promotion
//! disabled, so a fresh or corrupt metrics file cannot let anything through.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Gate and runbook inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SystemMetrics {
    pub monthly_net_cad: f64,
    pub monthly_burn_cad: f64,
    pub critical_runbook_blockers: u32,
    pub outcomes_required_ratio: f64,
    pub outcomes_recorded_ratio: f64,
    pub quarantine_backlog: u64,
    pub clean_promotion_enabled: bool,
}

impl Default for SystemMetrics {
    fn default() -> Self {
        Self {
            monthly_net_cad: 0.0,
            monthly_burn_cad: 0.0,
            critical_runbook_blockers: 0,
            outcomes_required_ratio: 0.0,
            outcomes_recorded_ratio: 0.0,
            quarantine_backlog: 0,
            clean_promotion_enabled: false,
        }
    }
}

/// File-backed metrics store
pub struct MetricsStore {
    path: PathBuf,
    current: RwLock<SystemMetrics>,
}

impl MetricsStore {
    /// Open the store, reading the persisted metrics if present.
    /// Missing or corrupt content falls back to the restrictive defaults.
    pub fn open(data_dir: &std::path::Path) -> Self {
        let path = data_dir.join("system_metrics.json");
        let current = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(m) => m,
                Err(e) => {
                    warn!("Corrupt metrics file {:?}, using defaults: {}", path, e);
                    SystemMetrics::default()
                }
            },
            Err(_) => SystemMetrics::default(),
        };
        Self {
            path,
            current: RwLock::new(current),
        }
    }

    /// Current metrics snapshot
    pub async fn get(&self) -> SystemMetrics {
        self.current.read().await.clone()
    }

    /// Replace the metrics and persist them
    pub async fn set(&self, metrics: SystemMetrics) -> Result<SystemMetrics, AppError> {
        let mut current = self.current.write().await;
        crate::engine::store::write_json_atomic(&self.path, &metrics)
            .map_err(|e| AppError::Storage(format!("Failed to persist metrics: {}", e)))?;
        *current = metrics.clone();
        info!("Metrics updated: net={} burn={}", metrics.monthly_net_cad, metrics.monthly_burn_cad);
        Ok(metrics)
    }
}
