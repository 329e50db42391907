use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Wraps broker sends. After `failure_threshold` consecutive failures the
// breaker opens and publish calls fail fast with BrokerUnavailable instead
// of each waiting out the producer timeout. After `timeout` one trial call is let
// through (HalfOpen); `success_threshold` successes close it again.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CircuitState {
    Closed,     // Normal operation
    Open,       // Blocking requests
    HalfOpen,   // Testing recovery
}

#[derive(Clone)]
pub struct CircuitBreakerConfig {
    /// Number of failures before opening circuit
    pub failure_threshold: u32,
    /// Time to wait before attempting recovery
    pub timeout: Duration,
    /// Number of successes needed to close circuit from half-open
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(60),
            success_threshold: 2,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
}

#[derive(Clone)]
pub struct CircuitBreaker {
    inner: Arc<Mutex<BreakerState>>,
    config: CircuitBreakerConfig,
}

#[derive(Debug)]
pub enum CircuitBreakerError<E> {
    CircuitOpen,
    OperationFailed(E),
}

impl<E: std::fmt::Display> std::fmt::Display for CircuitBreakerError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitBreakerError::CircuitOpen => write!(f, "Circuit breaker is open"),
            CircuitBreakerError::OperationFailed(e) => write!(f, "Operation failed: {}", e),
        }
    }
}

impl<E: std::error::Error> std::error::Error for CircuitBreakerError<E> {}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                success_count: 0,
                opened_at: None,
            })),
            config,
        }
    }

    /// Run `operation` unless the circuit is open
    pub async fn call<F, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: std::future::Future<Output = Result<T, E>>,
    {
        if !self.admit().await {
            return Err(CircuitBreakerError::CircuitOpen);
        }

        match operation.await {
            Ok(value) => {
                self.on_success().await;
                Ok(value)
            }
            Err(err) => {
                self.on_failure().await;
                Err(CircuitBreakerError::OperationFailed(err))
            }
        }
    }

    pub async fn get_state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    async fn admit(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.state != CircuitState::Open {
            return true;
        }

        let cooled_down = inner
            .opened_at
            .map(|at| at.elapsed() >= self.config.timeout)
            .unwrap_or(true);

        if cooled_down {
            tracing::info!("Circuit breaker transitioning to HalfOpen");
            inner.state = CircuitState::HalfOpen;
            inner.success_count = 0;
        }
        cooled_down
    }

    async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.success_count += 1;
                if inner.success_count >= self.config.success_threshold {
                    tracing::info!(successes = inner.success_count, "Circuit breaker closing");
                    inner.state = CircuitState::Closed;
                    inner.failure_count = 0;
                    inner.success_count = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Closed => inner.failure_count = 0,
            CircuitState::Open => {}
        }
    }

    async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.failure_count += 1;

        match inner.state {
            CircuitState::Closed if inner.failure_count >= self.config.failure_threshold => {
                tracing::warn!(failures = inner.failure_count, "Circuit breaker opening");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                tracing::warn!("Failure during half-open, reopening circuit");
                inner.state = CircuitState::Open;
                inner.success_count = 0;
                inner.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}
