//! Engine state persistence
//!
//! The durable, fail-closed map of engine name to lifecycle state, kept as a
//! single flat JSON snapshot. Missing or corrupt content never surfaces as an
//! error: `load` falls back to the registry defaults, which are the most
//! restrictive states each engine is allowed to start in. Saves go through
//! write-to-temp-then-rename so a crash mid-write cannot leave a torn file.

use crate::engine::states::EngineState;
use crate::error::AppError;
use crate::registry::EngineRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// The persisted snapshot: every registered engine's current state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStateSnapshot {
    pub version: u64,
    pub states: HashMap<String, EngineState>,
}

/// Write a JSON value atomically: temp file in the same directory, then
/// rename over the target. Shared by every file-backed store in the crate.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    let raw = serde_json::to_string_pretty(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(&tmp, raw)?;
    std::fs::rename(&tmp, path)
}

/// Durable engine-state store
///
/// All mutation goes through a single mutex held across the read-modify-write,
/// so concurrent transition requests cannot lose updates.
pub struct EngineStateStore {
    path: PathBuf,
    snapshot: Mutex<EngineStateSnapshot>,
}

impl EngineStateStore {
    /// Open the store, loading the persisted snapshot fail-closed.
    pub fn open(data_dir: &Path, registry: &EngineRegistry) -> Self {
        let path = data_dir.join("engine_states.json");
        let snapshot = Self::load(&path, registry);
        Self {
            path,
            snapshot: Mutex::new(snapshot),
        }
    }

    /// Read the snapshot from disk. Never raises: a missing file, a corrupt
    /// file, or a file mentioning engines the registry does not know all
    /// resolve to registry defaults for the affected entries.
    fn load(path: &Path, registry: &EngineRegistry) -> EngineStateSnapshot {
        let mut snapshot = Self::defaults(registry);

        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(_) => {
                info!("No engine state file at {:?}, using registry defaults", path);
                return snapshot;
            }
        };

        let persisted: EngineStateSnapshot = match serde_json::from_str(&raw) {
            Ok(p) => p,
            Err(e) => {
                warn!("Corrupt engine state file {:?}, using registry defaults: {}", path, e);
                return snapshot;
            }
        };

        // Overlay persisted entries for registered engines only; ad hoc names
        // in the file are dropped (closed world).
        snapshot.version = persisted.version;
        for (name, state) in persisted.states {
            if registry.contains(&name) {
                snapshot.states.insert(name, state);
            } else {
                warn!("Ignoring persisted state for unregistered engine '{}'", name);
            }
        }
        snapshot
    }

    fn defaults(registry: &EngineRegistry) -> EngineStateSnapshot {
        EngineStateSnapshot {
            version: 0,
            states: registry
                .list()
                .iter()
                .map(|e| (e.name.clone(), e.initial_state))
                .collect(),
        }
    }

    /// Current state of one engine, if present in the snapshot
    pub async fn get_state(&self, name: &str) -> Option<EngineState> {
        self.snapshot.lock().await.states.get(name).copied()
    }

    /// All current states
    pub async fn all_states(&self) -> HashMap<String, EngineState> {
        self.snapshot.lock().await.states.clone()
    }

    /// Snapshot version (bumped on every successful save)
    pub async fn version(&self) -> u64 {
        self.snapshot.lock().await.version
    }

    /// Set one engine's state and persist the whole snapshot atomically.
    /// Only the transition authority calls this.
    pub(crate) async fn set_state(&self, name: &str, state: EngineState) -> Result<(), AppError> {
        let mut snapshot = self.snapshot.lock().await;
        Self::commit(&self.path, &mut snapshot, name, state)
    }

    /// Compare-and-set: write `state` only if the engine's current state is
    /// still `expected_current`, checked under the snapshot mutex. This is
    /// what makes check-then-write callers safe against a concurrent
    /// transition landing between their read and their write.
    pub(crate) async fn set_state_if(
        &self,
        name: &str,
        expected_current: EngineState,
        state: EngineState,
    ) -> Result<(), AppError> {
        let mut snapshot = self.snapshot.lock().await;
        let current = snapshot.states.get(name).copied();
        if current != Some(expected_current) {
            return Err(AppError::TransitionDenied(format!(
                "Engine '{}' changed concurrently: expected {}, found {}",
                name,
                expected_current,
                current.map_or_else(|| "no state".to_string(), |s| s.to_string())
            )));
        }
        Self::commit(&self.path, &mut snapshot, name, state)
    }

    fn commit(
        path: &Path,
        snapshot: &mut EngineStateSnapshot,
        name: &str,
        state: EngineState,
    ) -> Result<(), AppError> {
        let mut next = snapshot.clone();
        next.states.insert(name.to_string(), state);
        next.version += 1;

        write_json_atomic(path, &next)
            .map_err(|e| AppError::Storage(format!("Failed to persist engine states: {}", e)))?;

        *snapshot = next;
        info!("Engine '{}' state persisted as {} (snapshot v{})", name, state, snapshot.version);
        Ok(())
    }
}
