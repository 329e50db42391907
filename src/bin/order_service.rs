use actix_web::{web, App, HttpServer};
use std::sync::Arc;

use order_event_sourcing::api;
use order_event_sourcing::domain::order::OrderCommandProcessor;
use order_event_sourcing::event_sourcing::store::ScyllaEventStore;
use order_event_sourcing::health::HealthProbe;
use order_event_sourcing::messaging::RedpandaClient;
use order_event_sourcing::metrics::Metrics;
use order_event_sourcing::telemetry::init_tracing;
use order_event_sourcing::utils::RetryConfig;
use order_event_sourcing::Config;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env("order_service")?;
    tracing::info!(
        topic = %config.topic,
        brokers = %config.brokers,
        keyspace = %config.keyspace,
        "🚀 Starting order service"
    );

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Event store (retries until ScyllaDB is reachable) ===
    let store = Arc::new(
        ScyllaEventStore::connect(
            &config.scylla_nodes,
            &config.keyspace,
            config.store_timeout,
            RetryConfig::startup(),
        )
        .await?,
    );

    // === 3. Redpanda producer (with circuit breaker) ===
    let redpanda = Arc::new(RedpandaClient::new(&config.brokers, config.publish_timeout)?);

    // === 4. Command processor ===
    let processor = web::Data::new(OrderCommandProcessor::new(
        store,
        redpanda.clone(),
        config.topic.clone(),
        metrics.clone(),
    ));
    let probe = web::Data::new(HealthProbe::new("order-service", Some(redpanda), metrics.clone()));
    let metrics = web::Data::from(metrics);

    // === 5. HTTP intake ===
    tracing::info!(bind = %config.http_bind, "🌐 Accepting order commands");
    HttpServer::new(move || {
        App::new()
            .app_data(processor.clone())
            .app_data(metrics.clone())
            .app_data(probe.clone())
            .configure(api::routes)
    })
    .bind(&config.http_bind)?
    .run()
    .await?;

    tracing::info!("👋 Order service stopped");
    Ok(())
}
