use std::env;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Service Configuration
// ============================================================================
//
// Read from the process environment (a local .env file is honored).
// Topic, broker and store targets are required: there is no sensible
// default for where the event log lives.
//
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub topic: String,
    pub brokers: String,
    pub scylla_nodes: Vec<String>,
    pub keyspace: String,
    pub consumer_group: String,
    pub http_bind: String,
    pub metrics_port: u16,
    pub store_timeout: Duration,
    pub publish_timeout: Duration,
}

impl Config {
    /// Load configuration for a service whose keyspace defaults to `default_keyspace`
    pub fn from_env(default_keyspace: &str) -> Result<Self, ConfigError> {
        // A missing .env file is fine; real deployments set the variables directly
        let _ = dotenvy::dotenv();
        Self::from_lookup(default_keyspace, |name| env::var(name).ok())
    }

    fn from_lookup<F>(default_keyspace: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let scylla_nodes: Vec<String> = required("SCYLLA_NODES")?
            .split(',')
            .map(|node| node.trim().to_string())
            .filter(|node| !node.is_empty())
            .collect();

        if scylla_nodes.is_empty() {
            return Err(ConfigError::Invalid {
                name: "SCYLLA_NODES",
                value: String::new(),
            });
        }

        // The keyspace is spliced into schema CQL, so only plain identifiers pass
        let keyspace = lookup("SCYLLA_KEYSPACE").unwrap_or_else(|| default_keyspace.to_string());
        if !is_cql_identifier(&keyspace) {
            return Err(ConfigError::Invalid {
                name: "SCYLLA_KEYSPACE",
                value: keyspace,
            });
        }

        Ok(Self {
            topic: required("ORDER_EVENT_TOPIC")?,
            brokers: required("KAFKA_BROKERS")?,
            scylla_nodes,
            keyspace,
            consumer_group: lookup("CONSUMER_GROUP").unwrap_or_else(|| "shipping-service".to_string()),
            http_bind: lookup("HTTP_BIND").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
            metrics_port: parse_or(&lookup, "METRICS_PORT", 9090)?,
            store_timeout: Duration::from_millis(parse_or(&lookup, "STORE_TIMEOUT_MS", 5000)?),
            publish_timeout: Duration::from_millis(parse_or(&lookup, "PUBLISH_TIMEOUT_MS", 5000)?),
        })
    }
}

fn is_cql_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 48
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn required_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ORDER_EVENT_TOPIC", "order-events"),
            ("KAFKA_BROKERS", "127.0.0.1:9092"),
            ("SCYLLA_NODES", "10.0.0.1:9042, 10.0.0.2:9042"),
        ]
    }

    #[test]
    fn test_defaults_applied_to_optional_values() {
        let config = Config::from_lookup("order_service", lookup_from(&required_vars())).unwrap();

        assert_eq!(config.topic, "order-events");
        assert_eq!(config.scylla_nodes, vec!["10.0.0.1:9042", "10.0.0.2:9042"]);
        assert_eq!(config.keyspace, "order_service");
        assert_eq!(config.consumer_group, "shipping-service");
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.store_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_missing_topic_is_rejected() {
        let vars: Vec<_> = required_vars()
            .into_iter()
            .filter(|(k, _)| *k != "ORDER_EVENT_TOPIC")
            .collect();

        let err = Config::from_lookup("order_service", lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("ORDER_EVENT_TOPIC")));
    }

    #[test]
    fn test_invalid_timeout_is_rejected() {
        let mut vars = required_vars();
        vars.push(("PUBLISH_TIMEOUT_MS", "soon"));

        let err = Config::from_lookup("order_service", lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PUBLISH_TIMEOUT_MS", .. }));
    }

    #[test]
    fn test_keyspace_must_be_plain_identifier() {
        let mut vars = required_vars();
        vars.push(("SCYLLA_KEYSPACE", "orders; DROP TABLE x"));

        let err = Config::from_lookup("order_service", lookup_from(&vars)).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SCYLLA_KEYSPACE", .. }));
    }

    #[test]
    fn test_overrides_are_used() {
        let mut vars = required_vars();
        vars.push(("SCYLLA_KEYSPACE", "shipping_ks"));
        vars.push(("STORE_TIMEOUT_MS", "250"));

        let config = Config::from_lookup("shipping_service", lookup_from(&vars)).unwrap();
        assert_eq!(config.keyspace, "shipping_ks");
        assert_eq!(config.store_timeout, Duration::from_millis(250));
    }
}
