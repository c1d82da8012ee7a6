//! Service layer for the kicker core
//!
//! This module contains the application state that wires every component to
//! a shared store, plus the simulation driven by the binary.

pub mod app;

pub use app::{AppState, FinishedMatch, LeaderboardEntry, ServiceError, SimulationReport};
