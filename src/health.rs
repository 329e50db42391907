use actix_web::{web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::messaging::RedpandaClient;
use crate::metrics::Metrics;
use crate::utils::CircuitState;

// ============================================================================
// Health Reporting
// ============================================================================
//
// The only component whose health the process can observe cheaply is the
// broker producer, through its circuit breaker. Stores report failures per
// request instead.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy)
    }

    fn severity(&self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded(_) => 1,
            HealthStatus::Unhealthy(_) => 2,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub last_check: DateTime<Utc>,
}

impl ComponentHealth {
    pub fn new(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemHealth {
    pub service: &'static str,
    pub status: HealthStatus,
    pub components: Vec<ComponentHealth>,
}

impl SystemHealth {
    /// Overall status is the worst component status
    pub fn from_components(service: &'static str, components: Vec<ComponentHealth>) -> Self {
        let status = components
            .iter()
            .map(|c| &c.status)
            .max_by_key(|s| s.severity())
            .cloned()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            service,
            status,
            components,
        }
    }
}

pub struct HealthProbe {
    service: &'static str,
    broker: Option<Arc<RedpandaClient>>,
    metrics: Arc<Metrics>,
}

impl HealthProbe {
    pub fn new(service: &'static str, broker: Option<Arc<RedpandaClient>>, metrics: Arc<Metrics>) -> Self {
        Self {
            service,
            broker,
            metrics,
        }
    }

    pub async fn check(&self) -> SystemHealth {
        let mut components = Vec::new();

        if let Some(broker) = &self.broker {
            let state = broker.get_circuit_breaker_state().await;
            self.metrics.update_circuit_breaker_state(state);
            components.push(ComponentHealth::new("broker", circuit_health(state)));
        }

        SystemHealth::from_components(self.service, components)
    }
}

pub fn circuit_health(state: CircuitState) -> HealthStatus {
    match state {
        CircuitState::Closed => HealthStatus::Healthy,
        CircuitState::HalfOpen => HealthStatus::Degraded("broker circuit half-open".into()),
        CircuitState::Open => HealthStatus::Unhealthy("broker circuit open".into()),
    }
}

pub async fn health_handler(probe: web::Data<HealthProbe>) -> impl Responder {
    let health = probe.check().await;
    if health.status.is_healthy() {
        HttpResponse::Ok().json(health)
    } else {
        HttpResponse::ServiceUnavailable().json(health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overall_status_is_worst_component() {
        let health = SystemHealth::from_components(
            "order-service",
            vec![
                ComponentHealth::new("a", HealthStatus::Healthy),
                ComponentHealth::new("b", HealthStatus::Unhealthy("down".into())),
                ComponentHealth::new("c", HealthStatus::Degraded("slow".into())),
            ],
        );
        assert_eq!(health.status, HealthStatus::Unhealthy("down".into()));
    }

    #[test]
    fn test_no_components_is_healthy() {
        let health = SystemHealth::from_components("shipping-service", vec![]);
        assert!(health.status.is_healthy());
    }

    #[test]
    fn test_circuit_state_mapping() {
        assert!(circuit_health(CircuitState::Closed).is_healthy());
        assert!(matches!(circuit_health(CircuitState::HalfOpen), HealthStatus::Degraded(_)));
        assert!(matches!(circuit_health(CircuitState::Open), HealthStatus::Unhealthy(_)));
    }

    #[tokio::test]
    async fn test_health_without_broker() {
        let probe = HealthProbe::new("order-service", None, Arc::new(Metrics::new().unwrap()));
        let health = probe.check().await;
        assert_eq!(health.service, "order-service");
        assert!(health.components.is_empty());
    }
}
