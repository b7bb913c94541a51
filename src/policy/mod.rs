//! Transition policy: gates, results, and their composition

pub mod engine;
pub mod gates;
pub mod result;

pub use engine::evaluate_transition_policy;
pub use result::PolicyResult;
