use std::sync::Arc;

use order_event_sourcing::domain::shipping::OrderEventSubscriber;
use order_event_sourcing::event_sourcing::store::ScyllaEventStore;
use order_event_sourcing::health::HealthProbe;
use order_event_sourcing::messaging::{supervise, SubscriptionTable};
use order_event_sourcing::metrics::{start_metrics_server, Metrics};
use order_event_sourcing::telemetry::init_tracing;
use order_event_sourcing::utils::RetryConfig;
use order_event_sourcing::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env("shipping_service")?;
    tracing::info!(
        topic = %config.topic,
        group_id = %config.consumer_group,
        keyspace = %config.keyspace,
        "🚀 Starting shipping service"
    );

    // === 1. Metrics, served from a background thread ===
    let metrics = Arc::new(Metrics::new()?);
    let probe = Arc::new(HealthProbe::new("shipping-service", None, metrics.clone()));
    {
        let metrics = metrics.clone();
        let port = config.metrics_port;
        std::thread::spawn(move || {
            let result = actix_web::rt::System::new().block_on(start_metrics_server(metrics, probe, port));
            if let Err(e) = result {
                tracing::error!(error = %e, "Metrics server error");
            }
        });
    }

    // === 2. Shipping's own event store ===
    let store = Arc::new(
        ScyllaEventStore::connect(
            &config.scylla_nodes,
            &config.keyspace,
            config.store_timeout,
            RetryConfig::startup(),
        )
        .await?,
    );

    // === 3. Subscription table ===
    let subscriber = Arc::new(OrderEventSubscriber::new(store, metrics));
    let table = SubscriptionTable::new().subscribe(config.topic.clone(), config.consumer_group.clone(), subscriber);
    if table.is_empty() {
        anyhow::bail!("no subscriptions configured");
    }

    // === 4. One supervised consumer task per subscription ===
    let mut consumers = Vec::with_capacity(table.len());
    for subscription in table.iter() {
        consumers.push(tokio::spawn(supervise(
            config.brokers.clone(),
            subscription.clone(),
            RetryConfig::redelivery(),
        )));
    }

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
        _ = futures_util::future::join_all(consumers) => {
            tracing::warn!("All consumers stopped");
        }
    }

    tracing::info!("👋 Shipping service stopped");
    Ok(())
}
