// Private module declaration
mod server;

use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry};

use crate::domain::order::OrderStatus;
use crate::utils::CircuitState;

// Re-export for public API
pub use server::{metrics_handler, start_metrics_server};

// ============================================================================
// Metrics Module - Prometheus metrics for observability
// ============================================================================
//
// Covers both services:
// - events appended / published, by status
// - failures by stage (append, publish, handle) and error kind
// - subscriber outcomes (acted, ignored, failed)
// - command latency
// - broker circuit breaker state
//
// Each Metrics owns its own Registry, so tests never share counters.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    pub events_appended: IntCounterVec,
    pub events_published: IntCounterVec,
    pub event_failures: IntCounterVec,
    pub subscriber_events: IntCounterVec,
    pub command_duration: HistogramVec,
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_appended = IntCounterVec::new(
            Opts::new("order_events_appended_total", "Order events written to the event store"),
            &["status"],
        )?;
        registry.register(Box::new(events_appended.clone()))?;

        let events_published = IntCounterVec::new(
            Opts::new("order_events_published_total", "Order events accepted by the broker"),
            &["status"],
        )?;
        registry.register(Box::new(events_published.clone()))?;

        let event_failures = IntCounterVec::new(
            Opts::new("order_event_failures_total", "Failures by pipeline stage and error kind"),
            &["stage", "kind"],
        )?;
        registry.register(Box::new(event_failures.clone()))?;

        let subscriber_events = IntCounterVec::new(
            Opts::new("subscriber_events_total", "Events received by the shipping subscriber"),
            &["status", "outcome"],
        )?;
        registry.register(Box::new(subscriber_events.clone()))?;

        let command_duration = HistogramVec::new(
            HistogramOpts::new("order_command_duration_seconds", "Command processing duration")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["command"],
        )?;
        registry.register(Box::new(command_duration.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "circuit_breaker_state",
            "Circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            events_appended,
            events_published,
            event_failures,
            subscriber_events,
            command_duration,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_appended(&self, status: OrderStatus) {
        self.events_appended.with_label_values(&[status.as_str()]).inc();
    }

    pub fn record_published(&self, status: OrderStatus) {
        self.events_published.with_label_values(&[status.as_str()]).inc();
    }

    pub fn record_failure(&self, stage: &str, kind: &str) {
        self.event_failures.with_label_values(&[stage, kind]).inc();
    }

    pub fn record_subscriber_event(&self, status: OrderStatus, outcome: &str) {
        self.subscriber_events
            .with_label_values(&[status.as_str(), outcome])
            .inc();
    }

    pub fn observe_command(&self, command: &str, duration_secs: f64) {
        self.command_duration
            .with_label_values(&[command])
            .observe(duration_secs);
    }

    pub fn update_circuit_breaker_state(&self, state: CircuitState) {
        let value = match state {
            CircuitState::Closed => 0,
            CircuitState::Open => 1,
            CircuitState::HalfOpen => 2,
        };
        self.circuit_breaker_state.set(value);
    }
}
