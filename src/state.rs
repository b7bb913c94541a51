//! Application state management
//!
//! Contains shared state accessible across all handlers. Every store is
//! opened once at startup from the configured data directory; handlers get
//! Arc clones and never touch the filesystem paths directly.

use crate::config::Settings;
use crate::engine::{EngineStateStore, TransitionAuthority, TransitionService};
use crate::governance::GovernanceLedger;
use crate::guard::{KillSwitch, RuntimeGuard};
use crate::metrics::MetricsStore;
use crate::quarantine::QuarantineStore;
use crate::registry::EngineRegistry;
use crate::runbook::RunbookService;
use std::sync::Arc;

/// Application state shared across all handlers
pub struct AppState {
    /// Engine catalog (immutable after startup)
    pub registry: Arc<EngineRegistry>,

    /// Persisted engine states
    pub engine_store: Arc<EngineStateStore>,

    /// Full transition pipeline: gates, authority, audit
    pub transitions: TransitionService,

    /// Per-call action gate
    pub guard: RuntimeGuard,

    /// Global kill switch
    pub kill_switch: Arc<KillSwitch>,

    /// Gate inputs
    pub metrics: Arc<MetricsStore>,

    /// Intake quarantine store
    pub quarantine: Arc<QuarantineStore>,

    /// Append-only decision ledger
    pub ledger: Arc<GovernanceLedger>,

    /// Go-live status aggregation
    pub runbook: RunbookService,
}

impl AppState {
    /// Build the full object graph from settings. This is the only place
    /// the stores are opened; everything downstream shares these instances.
    pub fn new(settings: &Settings) -> Self {
        let data_dir = &settings.gate.data_dir;
        let registry = Arc::new(EngineRegistry::new());
        let engine_store = Arc::new(EngineStateStore::open(data_dir, &registry));
        let metrics = Arc::new(MetricsStore::open(data_dir));
        let quarantine = Arc::new(QuarantineStore::open(data_dir));
        let ledger = Arc::new(GovernanceLedger::open(data_dir));
        let kill_switch = Arc::new(KillSwitch::new(settings.gate.kill_switch_engaged));

        let authority = Arc::new(TransitionAuthority::new(
            registry.clone(),
            engine_store.clone(),
        ));
        let transitions = TransitionService::new(
            registry.clone(),
            engine_store.clone(),
            metrics.clone(),
            authority.clone(),
            ledger.clone(),
        );
        let guard = RuntimeGuard::new(
            registry.clone(),
            engine_store.clone(),
            kill_switch.clone(),
        );
        let runbook = RunbookService::new(
            engine_store.clone(),
            metrics.clone(),
            quarantine.clone(),
            kill_switch.clone(),
        );

        Self {
            registry,
            engine_store,
            transitions,
            guard,
            kill_switch,
            metrics,
            quarantine,
            ledger,
            runbook,
        }
    }
}

/// Type alias for shared state
pub type SharedState = Arc<AppState>;
