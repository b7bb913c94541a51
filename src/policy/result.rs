//! Policy evaluation results
//!
//! Every gate produces a `PolicyResult`; the policy engine merges them.
//! A failure here is data, not an exception: it bubbles up as a value so
//! callers can render "why blocked" without error handling.

use serde::{Deserialize, Serialize};

/// Outcome of one gate, or of a merged set of gates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyResult {
    /// True iff `blockers` is empty
    pub ok: bool,
    /// Hard failures, in gate-evaluation order
    pub blockers: Vec<String>,
    /// Soft concerns, in gate-evaluation order
    pub warnings: Vec<String>,
}

impl PolicyResult {
    /// A passing result with nothing to report
    pub fn pass() -> Self {
        Self {
            ok: true,
            blockers: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Build a result from collected reasons; `ok` is derived, never stated
    pub fn from_reasons(blockers: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            ok: blockers.is_empty(),
            blockers,
            warnings,
        }
    }

    /// Merge another result into this one: AND the verdicts, append the
    /// reasons first-gate-first
    pub fn merge(&mut self, other: PolicyResult) {
        self.blockers.extend(other.blockers);
        self.warnings.extend(other.warnings);
        self.ok = self.blockers.is_empty();
    }

    /// Blockers joined into one human-readable detail line
    pub fn blockers_detail(&self) -> String {
        self.blockers.join("; ")
    }
}
