//! Engine lifecycle: states, persistence, and the transition pipeline

pub mod authority;
pub mod service;
pub mod states;
pub mod store;

pub use authority::TransitionAuthority;
pub use service::TransitionService;
pub use states::EngineState;
pub use store::EngineStateStore;
