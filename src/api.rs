use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde::Serialize;

use crate::domain::order::{OrderCommand, OrderCommandProcessor, OrderError, OrderRequest};
use crate::error::EventError;
use crate::health::health_handler;
use crate::metrics::metrics_handler;

// ============================================================================
// Command Intake - HTTP routes for the order service
// ============================================================================
//
//   POST /orders/create               → 201 {orderId, status}
//   PUT  /orders/confirm/{order_id}   → 200 {orderId, status}
//   GET  /metrics                     → Prometheus text
//   GET  /health                      → component health
//
// Failures carry {error, message}, where `error` is the failure kind.
//
// ============================================================================

/// Register every route. Expects `web::Data` for OrderCommandProcessor,
/// Metrics and HealthProbe on the App.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("/create", web::post().to(create_order))
            .route("/confirm/{order_id}", web::put().to(confirm_order)),
    )
    .route("/metrics", web::get().to(metrics_handler))
    .route("/health", web::get().to(health_handler));
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl ResponseError for OrderError {
    fn status_code(&self) -> StatusCode {
        match self {
            OrderError::InvalidTransition { .. } => StatusCode::CONFLICT,
            OrderError::ForeignEvent { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::Malformed(e) | OrderError::NotStored(e) => event_status(e),
            OrderError::NotPublished { source, .. } => event_status(source),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        })
    }
}

fn event_status(error: &EventError) -> StatusCode {
    match error {
        EventError::MalformedCommand(_) => StatusCode::BAD_REQUEST,
        EventError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        EventError::StorageUnavailable(_) | EventError::BrokerUnavailable(_) => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        EventError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// An empty body is the same as `{}`.
fn parse_request(body: &[u8]) -> Result<OrderRequest, OrderError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(OrderRequest::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| OrderError::Malformed(EventError::MalformedCommand(e.to_string())))
}

async fn create_order(
    processor: web::Data<OrderCommandProcessor>,
    body: web::Bytes,
) -> Result<HttpResponse, OrderError> {
    let request = parse_request(&body)?;
    let response = processor.execute(OrderCommand::CreateOrder(request)).await?;
    Ok(HttpResponse::Created().json(response))
}

async fn confirm_order(
    processor: web::Data<OrderCommandProcessor>,
    path: web::Path<String>,
) -> Result<HttpResponse, OrderError> {
    let order_id = path.into_inner();
    let response = processor
        .execute(OrderCommand::ConfirmOrder { order_id })
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{OrderId, OrderResponse, OrderStatus};
    use crate::event_sourcing::store::InMemoryEventStore;
    use crate::health::HealthProbe;
    use crate::messaging::InMemoryBroker;
    use crate::metrics::Metrics;
    use actix_web::{test, App};
    use std::sync::Arc;

    const TOPIC: &str = "order-events";

    struct Backends {
        store: Arc<InMemoryEventStore>,
        broker: Arc<InMemoryBroker>,
        processor: web::Data<OrderCommandProcessor>,
        metrics: web::Data<Metrics>,
        probe: web::Data<HealthProbe>,
    }

    fn backends() -> Backends {
        let store = Arc::new(InMemoryEventStore::new());
        let broker = Arc::new(InMemoryBroker::new());
        let metrics = Arc::new(Metrics::new().unwrap());
        let processor = OrderCommandProcessor::new(store.clone(), broker.clone(), TOPIC, metrics.clone());
        let probe = HealthProbe::new("order-service", None, metrics.clone());

        Backends {
            store,
            broker,
            processor: web::Data::new(processor),
            metrics: web::Data::from(metrics),
            probe: web::Data::new(probe),
        }
    }

    macro_rules! app {
        ($b:expr) => {
            test::init_service(
                App::new()
                    .app_data($b.processor.clone())
                    .app_data($b.metrics.clone())
                    .app_data($b.probe.clone())
                    .configure(routes),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_create_returns_201_with_generated_id() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::post().uri("/orders/create").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert_eq!(body.status, OrderStatus::Created);
        assert_eq!(body.order_id.as_str().len(), 8);
        assert_eq!(b.store.len().await, 1);
        assert_eq!(b.broker.published_count(TOPIC).await, 1);
    }

    #[actix_web::test]
    async fn test_create_ignores_supplied_order_id() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::post()
            .uri("/orders/create")
            .set_json(serde_json::json!({"orderId": "mine"}))
            .to_request();
        let body: OrderResponse = test::read_body_json(test::call_service(&app, req).await).await;

        assert_ne!(body.order_id.as_str(), "mine");
    }

    #[actix_web::test]
    async fn test_create_with_invalid_json_is_400() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::post()
            .uri("/orders/create")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "malformed_command");
        assert!(b.store.is_empty().await);
    }

    #[actix_web::test]
    async fn test_confirm_returns_200_for_any_well_formed_id() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::put().uri("/orders/confirm/abc12345").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert_eq!(
            body,
            OrderResponse {
                order_id: OrderId::parse("abc12345").unwrap(),
                status: OrderStatus::Confirmed,
            }
        );
    }

    #[actix_web::test]
    async fn test_confirm_accepts_dots_and_tildes() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::put().uri("/orders/confirm/order.1~x").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let body: OrderResponse = test::read_body_json(resp).await;
        assert_eq!(body.order_id.as_str(), "order.1~x");
        assert_eq!(b.store.len().await, 1);
    }

    #[actix_web::test]
    async fn test_store_outage_is_503() {
        let b = backends();
        b.store.set_available(false);
        let app = app!(b);

        let req = test::TestRequest::post().uri("/orders/create").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "storage_unavailable");
    }

    #[actix_web::test]
    async fn test_publish_outage_is_503_but_event_is_stored() {
        let b = backends();
        b.broker.set_available(false);
        let app = app!(b);

        let req = test::TestRequest::put().uri("/orders/confirm/abc12345").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "broker_unavailable");
        assert_eq!(b.store.len().await, 1);
    }

    #[actix_web::test]
    async fn test_metrics_and_health_are_mounted() {
        let b = backends();
        let app = app!(b);

        let req = test::TestRequest::post().uri("/orders/create").to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get().uri("/metrics").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let text = test::read_body(resp).await;
        assert!(String::from_utf8_lossy(&text).contains("order_events_appended_total"));

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[::core::prelude::v1::test]
    fn test_status_mapping() {
        let timeout = OrderError::NotStored(EventError::Timeout { operation: "append", timeout_ms: 5 });
        assert_eq!(timeout.status_code(), StatusCode::GATEWAY_TIMEOUT);

        let conflict = OrderError::InvalidTransition {
            order_id: OrderId::parse("abc12345").unwrap(),
            from: Some(OrderStatus::Delivered),
            to: OrderStatus::Confirmed,
        };
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let serialization = OrderError::NotStored(EventError::Serialization("bad".into()));
        assert_eq!(serialization.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
