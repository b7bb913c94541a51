//! Engine registry
//!
//! The static, compiled-in catalog of every engine the system knows about,
//! plus the closed set of well-known actions. This is the closed world the
//! rest of the gate system resolves names against: an engine name that is not
//! here does not exist, and every lookup failure resolves to "blocked".

use crate::engine::states::EngineState;
use serde::{Deserialize, Serialize};

/// Static description of one engine (business capability module)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineDescriptor {
    /// Unique engine name, the key everywhere else
    pub name: String,
    /// Sequencing layer; lower layers are foundations for higher ones
    pub layer: u32,
    /// State a fresh deployment starts in
    pub initial_state: EngineState,
    /// Whether this engine may ever cause real-world effects
    pub allows_real_world_effects: bool,
    /// Capital domain the engine spends from, if any
    pub capital_domain: Option<String>,
}

/// A well-known action an engine can attempt
///
/// `real_world_effect=true` marks actions whose failure-to-block has real
/// consequences (message sent, contract dispatched, funds moved).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineAction {
    pub name: String,
    pub real_world_effect: bool,
}

impl EngineAction {
    pub fn new(name: &str, real_world_effect: bool) -> Self {
        Self {
            name: name.to_string(),
            real_world_effect,
        }
    }
}

/// Name of the forward-looking advisory engine. Permanent policy carve-out:
/// it may never be promoted to ACTIVE regardless of gate inputs.
pub const ADVISORY_ENGINE: &str = "horizon_advisory";

/// The static engine catalog
pub struct EngineRegistry {
    engines: Vec<EngineDescriptor>,
    actions: Vec<EngineAction>,
}

impl EngineRegistry {
    /// Create the registry with the built-in catalog
    pub fn new() -> Self {
        Self {
            engines: Self::default_engines(),
            actions: Self::default_actions(),
        }
    }

    /// Create a registry from an explicit catalog (tests and tooling)
    pub fn with_engines(engines: Vec<EngineDescriptor>) -> Self {
        Self {
            engines,
            actions: Self::default_actions(),
        }
    }

    /// Look up an engine by name
    pub fn get(&self, name: &str) -> Option<&EngineDescriptor> {
        self.engines.iter().find(|e| e.name == name)
    }

    /// Whether the name is a registered engine
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All registered engines
    pub fn list(&self) -> &[EngineDescriptor] {
        &self.engines
    }

    /// Look up a well-known action by name
    pub fn get_action(&self, name: &str) -> Option<&EngineAction> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// All well-known actions
    pub fn list_actions(&self) -> &[EngineAction] {
        &self.actions
    }

    fn default_engines() -> Vec<EngineDescriptor> {
        vec![
            EngineDescriptor {
                name: "intake".to_string(),
                layer: 1,
                initial_state: EngineState::Sandbox,
                allows_real_world_effects: false,
                capital_domain: None,
            },
            EngineDescriptor {
                name: "underwriting".to_string(),
                layer: 1,
                initial_state: EngineState::Dormant,
                allows_real_world_effects: false,
                capital_domain: None,
            },
            EngineDescriptor {
                name: "wholesaling".to_string(),
                layer: 2,
                initial_state: EngineState::Dormant,
                allows_real_world_effects: true,
                capital_domain: Some("real_estate".to_string()),
            },
            EngineDescriptor {
                name: "contracting".to_string(),
                layer: 2,
                initial_state: EngineState::Disabled,
                allows_real_world_effects: true,
                capital_domain: Some("real_estate".to_string()),
            },
            EngineDescriptor {
                name: "trading".to_string(),
                layer: 3,
                initial_state: EngineState::Disabled,
                allows_real_world_effects: true,
                capital_domain: Some("markets".to_string()),
            },
            EngineDescriptor {
                name: ADVISORY_ENGINE.to_string(),
                layer: 4,
                initial_state: EngineState::Dormant,
                allows_real_world_effects: false,
                capital_domain: None,
            },
        ]
    }

    fn default_actions() -> Vec<EngineAction> {
        vec![
            EngineAction::new("READ_ONLY", false),
            EngineAction::new("COMPUTE", false),
            EngineAction::new("OUTREACH", true),
            EngineAction::new("CONTRACT_SEND", true),
            EngineAction::new("TRADING_EXECUTE", true),
            EngineAction::new("PAYMENT_SEND", true),
        ]
    }
}

impl Default for EngineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_a_closed_world() {
        let reg = EngineRegistry::new();
        assert!(reg.contains("wholesaling"));
        assert!(reg.contains(ADVISORY_ENGINE));
        assert!(!reg.contains("made_up_engine"));
    }

    #[test]
    fn effectful_actions_are_flagged() {
        let reg = EngineRegistry::new();
        assert!(!reg.get_action("READ_ONLY").unwrap().real_world_effect);
        assert!(reg.get_action("OUTREACH").unwrap().real_world_effect);
        assert!(reg.get_action("TRADING_EXECUTE").unwrap().real_world_effect);
        assert!(reg.get_action("NOT_AN_ACTION").is_none());
    }

    #[test]
    fn layers_start_at_one() {
        let reg = EngineRegistry::new();
        assert!(reg.list().iter().all(|e| e.layer >= 1));
    }
}
