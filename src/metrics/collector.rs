//! Metrics collection using Prometheus
//!
//! This module provides metrics collection for the match lifecycle and the
//! rating engine using Prometheus metrics.

use crate::error::KickerError;
use crate::types::{MatchState, RatingChange};
use anyhow::Result;
use prometheus::{
    Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main metrics collector for the kicker core
#[derive(Clone)]
pub struct MetricsCollector {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Match lifecycle metrics
    match_metrics: MatchMetrics,

    /// Rating engine metrics
    rating_metrics: RatingMetrics,

    /// Performance metrics
    performance_metrics: PerformanceMetrics,
}

/// Match lifecycle metrics
#[derive(Clone)]
pub struct MatchMetrics {
    /// Total matches created
    pub matches_created_total: IntCounter,

    /// State transitions by target state
    pub transitions_total: IntCounterVec,

    /// Team membership changes (join/leave)
    pub membership_changes_total: IntCounterVec,

    /// Rejected operations by operation and error kind
    pub rejected_operations_total: IntCounterVec,
}

/// Rating engine metrics
#[derive(Clone)]
pub struct RatingMetrics {
    /// Applied rating updates by match outcome
    pub rating_updates_total: IntCounterVec,

    /// Distribution of rating deltas
    pub rating_delta: Histogram,

    /// Failed rating updates by error kind
    pub rating_failures_total: IntCounterVec,
}

/// Performance metrics
#[derive(Clone)]
pub struct PerformanceMetrics {
    /// Duration of core operations including store round trips
    pub operation_duration: HistogramVec,
}

impl MetricsCollector {
    /// Create a new metrics collector with default registry
    pub fn new() -> Result<Self> {
        let registry = Arc::new(Registry::new());
        Self::with_registry(registry)
    }

    /// Create a new metrics collector with custom registry
    pub fn with_registry(registry: Arc<Registry>) -> Result<Self> {
        let match_metrics = MatchMetrics::new(&registry)?;
        let rating_metrics = RatingMetrics::new(&registry)?;
        let performance_metrics = PerformanceMetrics::new(&registry)?;

        Ok(Self {
            registry,
            match_metrics,
            rating_metrics,
            performance_metrics,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> Arc<Registry> {
        self.registry.clone()
    }

    pub fn matches(&self) -> &MatchMetrics {
        &self.match_metrics
    }

    pub fn ratings(&self) -> &RatingMetrics {
        &self.rating_metrics
    }

    pub fn performance(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    pub fn record_match_created(&self) {
        self.match_metrics.matches_created_total.inc();
    }

    /// Record a match entering `state`
    pub fn record_transition(&self, state: MatchState) {
        let state_str = match state {
            MatchState::Open => "open",
            MatchState::Running => "running",
            MatchState::Finished => "finished",
        };

        self.match_metrics
            .transitions_total
            .with_label_values(&[state_str])
            .inc();
    }

    pub fn record_membership_change(&self, change: &str) {
        self.match_metrics
            .membership_changes_total
            .with_label_values(&[change])
            .inc();
    }

    /// Record a rejected lifecycle operation
    pub fn record_rejection(&self, operation: &str, error: &anyhow::Error) {
        self.match_metrics
            .rejected_operations_total
            .with_label_values(&[operation, error_label(error)])
            .inc();
    }

    pub fn record_rating_update(&self, change: &RatingChange) {
        let outcome = if change.actual > 0.5 {
            "win"
        } else if change.actual < 0.5 {
            "loss"
        } else {
            "draw"
        };

        self.rating_metrics
            .rating_updates_total
            .with_label_values(&[outcome])
            .inc();
        self.rating_metrics
            .rating_delta
            .observe(change.delta() as f64);
    }

    pub fn record_rating_failure(&self, error: &anyhow::Error) {
        self.rating_metrics
            .rating_failures_total
            .with_label_values(&[error_label(error)])
            .inc();
    }

    /// Record core operation duration
    pub fn record_operation(&self, operation: &str, duration: Duration) {
        self.performance_metrics
            .operation_duration
            .with_label_values(&[operation])
            .observe(duration.as_secs_f64());
    }

    /// Create a timer for measuring operation duration
    pub fn start_timer(&self) -> MetricsTimer {
        MetricsTimer::new()
    }
}

/// Metric label for the kind of an error
fn error_label(error: &anyhow::Error) -> &'static str {
    match KickerError::of(error) {
        Some(KickerError::NotFound { .. }) => "not_found",
        Some(KickerError::InvalidArgument { .. }) => "invalid_argument",
        Some(KickerError::InvariantViolation { .. }) => "invariant_violation",
        Some(KickerError::MissingArgument { .. }) => "missing_argument",
        Some(KickerError::Conflict { .. }) => "conflict",
        Some(KickerError::Storage { .. }) => "storage",
        Some(KickerError::Configuration { .. }) => "configuration",
        Some(KickerError::Internal { .. }) | None => "internal",
    }
}

/// Timer for measuring operation durations
pub struct MetricsTimer {
    start: Instant,
}

impl MetricsTimer {
    fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get the elapsed duration
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop the timer and return the duration
    pub fn stop(self) -> Duration {
        self.elapsed()
    }
}

impl MatchMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let matches_created_total =
            IntCounter::new("kicker_matches_created_total", "Total matches created")?;
        registry.register(Box::new(matches_created_total.clone()))?;

        let transitions_total = IntCounterVec::new(
            Opts::new(
                "kicker_match_transitions_total",
                "Match state transitions by target state",
            ),
            &["state"],
        )?;
        registry.register(Box::new(transitions_total.clone()))?;

        let membership_changes_total = IntCounterVec::new(
            Opts::new(
                "kicker_membership_changes_total",
                "Team membership changes",
            ),
            &["change"],
        )?;
        registry.register(Box::new(membership_changes_total.clone()))?;

        let rejected_operations_total = IntCounterVec::new(
            Opts::new(
                "kicker_rejected_operations_total",
                "Rejected match lifecycle operations",
            ),
            &["operation", "reason"],
        )?;
        registry.register(Box::new(rejected_operations_total.clone()))?;

        Ok(Self {
            matches_created_total,
            transitions_total,
            membership_changes_total,
            rejected_operations_total,
        })
    }
}

impl RatingMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let rating_updates_total = IntCounterVec::new(
            Opts::new("kicker_rating_updates_total", "Applied rating updates"),
            &["outcome"],
        )?;
        registry.register(Box::new(rating_updates_total.clone()))?;

        let rating_delta = Histogram::with_opts(
            HistogramOpts::new("kicker_rating_delta", "Rating change per update").buckets(vec![
                -100.0, -50.0, -25.0, -10.0, 0.0, 10.0, 25.0, 50.0, 100.0,
            ]),
        )?;
        registry.register(Box::new(rating_delta.clone()))?;

        let rating_failures_total = IntCounterVec::new(
            Opts::new("kicker_rating_failures_total", "Failed rating updates"),
            &["reason"],
        )?;
        registry.register(Box::new(rating_failures_total.clone()))?;

        Ok(Self {
            rating_updates_total,
            rating_delta,
            rating_failures_total,
        })
    }
}

impl PerformanceMetrics {
    fn new(registry: &Registry) -> Result<Self> {
        let operation_duration = HistogramVec::new(
            HistogramOpts::new(
                "kicker_operation_duration_seconds",
                "Duration of core operations",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
            &["operation"],
        )?;
        registry.register(Box::new(operation_duration.clone()))?;

        Ok(Self { operation_duration })
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new().expect("Failed to create default metrics collector")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_metrics_collector_creation() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        let _matches = collector.matches();
        let _ratings = collector.ratings();
        let _performance = collector.performance();
    }

    #[test]
    fn test_lifecycle_recording() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");

        collector.record_match_created();
        collector.record_transition(MatchState::Running);
        collector.record_transition(MatchState::Running);
        collector.record_membership_change("join");

        assert_eq!(collector.matches().matches_created_total.get(), 1);
        assert_eq!(
            collector
                .matches()
                .transitions_total
                .with_label_values(&["running"])
                .get(),
            2
        );
    }

    #[test]
    fn test_rejection_labels() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let error: anyhow::Error = KickerError::invalid("Team is full").into();

        collector.record_rejection("join_match", &error);
        collector.record_rejection("join_match", &anyhow::anyhow!("unclassified"));

        let rejected = &collector.matches().rejected_operations_total;
        assert_eq!(
            rejected
                .with_label_values(&["join_match", "invalid_argument"])
                .get(),
            1
        );
        assert_eq!(
            rejected.with_label_values(&["join_match", "internal"]).get(),
            1
        );
    }

    #[test]
    fn test_rating_update_outcomes() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let change = RatingChange {
            player_id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            old_score: 1200,
            new_score: 1228,
            expected: 0.39,
            actual: 0.67,
        };

        collector.record_rating_update(&change);

        assert_eq!(
            collector
                .ratings()
                .rating_updates_total
                .with_label_values(&["win"])
                .get(),
            1
        );
        assert_eq!(collector.ratings().rating_delta.get_sample_count(), 1);
    }

    #[test]
    fn test_metrics_timer() {
        let collector = MetricsCollector::new().expect("Failed to create metrics collector");
        let timer = collector.start_timer();

        std::thread::sleep(Duration::from_millis(10));
        let duration = timer.elapsed();
        assert!(duration >= Duration::from_millis(10));

        collector.record_operation("start_match", timer.stop());
        let families = collector.registry().gather();
        assert!(!families.is_empty());
    }
}
