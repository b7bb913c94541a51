//! Engine lifecycle state machine
//!
//! Every engine is in exactly one of four states, totally ordered:
//! `DISABLED < DORMANT < SANDBOX < ACTIVE`. The only legal transition is a
//! promotion by exactly one step, which forces every engine through SANDBOX
//! (the mandatory effects-disabled rehearsal stage) before it may go ACTIVE.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of an engine
///
/// Persisted as SCREAMING_SNAKE strings for compatibility with the flat-JSON
/// snapshot layout; in memory it is a closed enum so a fifth state is a
/// compile error at every match site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EngineState {
    /// Fully off; nothing runs
    Disabled,
    /// Installed but idle; may not run any code path
    Dormant,
    /// Running with real-world effects disabled
    Sandbox,
    /// Fully operational, effects permitted
    Active,
}

impl EngineState {
    /// Position in the total order (DISABLED=0 .. ACTIVE=3)
    pub fn order(self) -> u8 {
        match self {
            EngineState::Disabled => 0,
            EngineState::Dormant => 1,
            EngineState::Sandbox => 2,
            EngineState::Active => 3,
        }
    }

    /// All states, in order
    pub const ALL: [EngineState; 4] = [
        EngineState::Disabled,
        EngineState::Dormant,
        EngineState::Sandbox,
        EngineState::Active,
    ];

    /// Whether this state counts as operational capability (SANDBOX or ACTIVE)
    pub fn is_operational(self) -> bool {
        self.order() >= EngineState::Sandbox.order()
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EngineState::Disabled => "DISABLED",
            EngineState::Dormant => "DORMANT",
            EngineState::Sandbox => "SANDBOX",
            EngineState::Active => "ACTIVE",
        };
        f.write_str(s)
    }
}

/// Legal transition rule: promotion by exactly one step, nothing else.
///
/// No skipping, no lateral moves, no demotion via this path. Demotions happen
/// through the kill switch and operator tooling, not the promotion ladder.
pub fn can_transition(current: EngineState, target: EngineState) -> bool {
    target.order() == current.order() + 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn transition_matrix_has_exactly_three_legal_moves() {
        let mut legal = Vec::new();
        for s in EngineState::ALL {
            for t in EngineState::ALL {
                if can_transition(s, t) {
                    legal.push((s, t));
                }
            }
        }
        assert_eq!(
            legal,
            vec![
                (EngineState::Disabled, EngineState::Dormant),
                (EngineState::Dormant, EngineState::Sandbox),
                (EngineState::Sandbox, EngineState::Active),
            ]
        );
    }

    #[test]
    fn transition_is_exactly_plus_one_order() {
        for s in EngineState::ALL {
            for t in EngineState::ALL {
                assert_eq!(can_transition(s, t), t.order() == s.order() + 1);
            }
        }
    }

    #[test]
    fn no_self_transitions_or_demotions() {
        for s in EngineState::ALL {
            assert!(!can_transition(s, s));
        }
        assert!(!can_transition(EngineState::Active, EngineState::Sandbox));
        assert!(!can_transition(EngineState::Sandbox, EngineState::Disabled));
    }

    #[test]
    fn serializes_as_screaming_snake() {
        let json = serde_json::to_string(&EngineState::Sandbox).unwrap();
        assert_eq!(json, "\"SANDBOX\"");
        let back: EngineState = serde_json::from_str("\"ACTIVE\"").unwrap();
        assert_eq!(back, EngineState::Active);
    }
}
