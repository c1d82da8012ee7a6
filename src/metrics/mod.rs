//! Metrics for the kicker core
//!
//! Counters and histograms for match transitions, membership changes,
//! rejected operations and rating updates.

pub mod collector;

pub use collector::{MatchMetrics, MetricsCollector, MetricsTimer, PerformanceMetrics, RatingMetrics};
