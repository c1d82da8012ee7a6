//! Match lifecycle: the state machine on [`Match`](crate::types::Match) and
//! the manager that persists its transitions

pub mod instance;
pub mod manager;

pub use manager::MatchLifecycleManager;
