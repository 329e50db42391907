pub mod circuit_breaker;
pub mod retry;
pub mod timeout;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
pub use retry::{retry_with_backoff, RetryConfig, RetryResult};
pub use timeout::with_timeout;
