//! OpsGate - Engine Governance & Safety Gate
//!
//! Fail-closed authorization for a platform of business "engines" that can
//! cause irreversible real-world effects (outreach, contracts, trades,
//! payments). Nothing executes an effectful action unless the gate says so:
//!
//! - State machine: every engine climbs DISABLED -> DORMANT -> SANDBOX ->
//!   ACTIVE one step at a time, with policy gates on each upward move
//! - Runtime guard: every action is re-checked at the call site against the
//!   kill switch, the registry, and the engine's current state
//! - Quarantine: inbound data is untrusted until explicitly promoted
//! - Ledger: every governance decision is appended to a durable audit trail

mod config;
mod engine;
mod error;
mod governance;
mod guard;
mod metrics;
mod policy;
mod quarantine;
mod registry;
mod routes;
mod runbook;
mod state;

use crate::config::Settings;
use crate::routes::create_router;
use crate::state::AppState;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber for structured logging
    init_tracing();

    info!("Starting OpsGate - Engine Governance & Safety Gate...");

    // Load configuration
    let settings = Settings::load()?;
    info!(
        "Configuration loaded (data dir: {:?}, kill switch: {})",
        settings.gate.data_dir, settings.gate.kill_switch_engaged
    );
    if settings.gate.kill_switch_engaged {
        warn!("Starting with the kill switch ENGAGED; all effectful execution is blocked");
    }

    // Open the stores and wire the object graph
    let state = Arc::new(AppState::new(&settings));
    info!(
        "Registry loaded: {} engine(s), {} action class(es)",
        state.registry.list().len(),
        state.registry.list_actions().len()
    );

    // Build the router
    let app = create_router(state, &settings);

    // Create socket address
    let addr = SocketAddr::from((settings.server.host, settings.server.port));

    info!("Server listening on http://{}", addr);
    info!("");
    info!("API Endpoints:");
    info!("   --- Engine Governance ---");
    info!("   GET  /api/engines                     - Engine catalog with current states");
    info!("   GET  /api/engines/states              - Current state of every engine");
    info!("   POST /api/engines/transition          - Apply a transition (gated)");
    info!("   POST /api/engines/transition/evaluate - Dry-run the policy gates");
    info!("   GET  /api/engines/actions             - Known action classes");
    info!("   POST /api/engines/actions/check       - Runtime guard check for one action");
    info!("   GET/POST /api/engines/kill-switch     - Read or flip the kill switch");
    info!("");
    info!("   --- Intake Quarantine ---");
    info!("   POST /api/intake/items                - Ingest (always lands QUARANTINE/T0)");
    info!("   GET  /api/intake/items                - List items (?status=...)");
    info!("   POST /api/intake/items/{{id}}/promote   - Promote to CLEAN");
    info!("   POST /api/intake/items/{{id}}/reject    - Reject with a reason");
    info!("");
    info!("   --- Governance & Runbook ---");
    info!("   POST /api/governance/decisions        - Append a decision");
    info!("   GET  /api/governance/decisions        - Query by subject or role");
    info!("   GET  /api/runbook/status              - Go-live status (?format=markdown)");
    info!("   GET/PUT /api/metrics                  - Gate inputs");
    info!("");

    // Create TCP listener and serve
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing with structured logging
fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,opsgate_api=debug,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .compact(),
        )
        .init();
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down gracefully..."),
        _ = terminate => info!("Received SIGTERM, shutting down gracefully..."),
    }
}
