//! Error types for the geocoding resilience layer.
//!
//! Errors are categorized by their source and nature so the orchestrator can
//! decide whether a failure should count against a provider's circuit breaker
//! or merely trigger fallback to the next tier.

use std::time::Duration;
use thiserror::Error;

/// Top-level error type for geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// Network and transport errors.
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Provider-side errors (non-2xx responses, malformed payloads).
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider response could not be normalized into a result.
    #[error("Parse error: {message}")]
    Parse {
        /// Details about what failed to parse.
        message: String,
    },

    /// The local rate limiter rejected the call before any network I/O.
    #[error("Rate limited locally{}", retry_hint(.retry_after))]
    RateLimited {
        /// Estimated wait until a token becomes available.
        retry_after: Option<Duration>,
    },

    /// The circuit breaker rejected the call before any network I/O.
    #[error("Circuit open for provider {provider}")]
    CircuitOpen {
        /// The provider whose circuit is open.
        provider: String,
    },

    /// The provider's usage quota is exhausted.
    #[error("Quota exceeded: {message}")]
    QuotaExceeded {
        /// Details about the quota breach.
        message: String,
    },

    /// The provider responded but found no match for the address.
    #[error("No match found for address")]
    NotFound,

    /// Cache store errors (treated as misses by the orchestrator).
    #[error("Cache error: {message}")]
    Cache {
        /// Details from the cache collaborator.
        message: String,
    },

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl GeocodeError {
    /// Returns true if this error should count against the provider's
    /// circuit breaker.
    ///
    /// Rejections that happen before any call is made (`RateLimited`,
    /// `CircuitOpen`, locally detected `QuotaExceeded`) and `NotFound` (the
    /// provider answered, it just had no match) do not feed the breaker.
    pub fn counts_as_provider_failure(&self) -> bool {
        matches!(
            self,
            GeocodeError::Network(_) | GeocodeError::Provider(_) | GeocodeError::Parse { .. }
        )
    }

    /// Returns true if no upstream call was made before this error.
    pub fn is_local_rejection(&self) -> bool {
        matches!(
            self,
            GeocodeError::RateLimited { .. } | GeocodeError::CircuitOpen { .. }
        )
    }
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(wait) => format!(": retry in {}ms", wait.as_millis()),
        None => String::new(),
    }
}

/// Network and transport errors.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The request did not complete within its deadline.
    #[error("Request timed out after {elapsed:?}")]
    Timeout {
        /// How long the request ran before expiring.
        elapsed: Duration,
    },

    /// Connection-level failure (refused, reset, DNS).
    #[error("Connection failed: {message}")]
    Connection {
        /// Details about the connection failure.
        message: String,
    },
}

/// Provider-side errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider returned a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// A snippet of the response body.
        message: String,
    },

    /// The provider returned a response the adapter could not interpret.
    #[error("Malformed response: {message}")]
    Malformed {
        /// Details about the malformed response.
        message: String,
    },
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// An endpoint URL failed to parse.
    #[error("Invalid endpoint URL {url}: {details}")]
    InvalidEndpoint {
        /// The invalid URL.
        url: String,
        /// Details about the validation error.
        details: String,
    },

    /// A rate limit was configured with a non-positive rate or zero burst.
    #[error("Invalid rate limit for {provider}: rate={rate}, burst={burst}")]
    InvalidRateLimit {
        /// The provider the limit applies to.
        provider: String,
        /// The configured refill rate.
        rate: f64,
        /// The configured burst size.
        burst: u32,
    },

    /// A circuit breaker threshold of zero would never admit a call.
    #[error("Invalid circuit breaker threshold for {provider}: {threshold}")]
    InvalidThreshold {
        /// The provider the breaker applies to.
        provider: String,
        /// The configured threshold.
        threshold: u32,
    },

    /// Batch concurrency must admit at least one in-flight call.
    #[error("Invalid batch concurrency: {value}")]
    InvalidConcurrency {
        /// The configured concurrency limit.
        value: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_failures_feed_the_breaker() {
        let timeout = GeocodeError::Network(NetworkError::Timeout {
            elapsed: Duration::from_secs(5),
        });
        let http = GeocodeError::Provider(ProviderError::HttpStatus {
            status: 500,
            message: "internal".to_string(),
        });
        let parse = GeocodeError::Parse {
            message: "bad json".to_string(),
        };

        assert!(timeout.counts_as_provider_failure());
        assert!(http.counts_as_provider_failure());
        assert!(parse.counts_as_provider_failure());
    }

    #[test]
    fn rejections_and_not_found_do_not_feed_the_breaker() {
        let rate_limited = GeocodeError::RateLimited { retry_after: None };
        let circuit_open = GeocodeError::CircuitOpen {
            provider: "free".to_string(),
        };
        let quota = GeocodeError::QuotaExceeded {
            message: "daily limit".to_string(),
        };

        assert!(!rate_limited.counts_as_provider_failure());
        assert!(!circuit_open.counts_as_provider_failure());
        assert!(!quota.counts_as_provider_failure());
        assert!(!GeocodeError::NotFound.counts_as_provider_failure());

        assert!(rate_limited.is_local_rejection());
        assert!(circuit_open.is_local_rejection());
        assert!(!quota.is_local_rejection());
    }

    #[test]
    fn error_display_includes_context() {
        let err = GeocodeError::CircuitOpen {
            provider: "paid".to_string(),
        };
        assert_eq!(err.to_string(), "Circuit open for provider paid");

        let err = GeocodeError::RateLimited {
            retry_after: Some(Duration::from_millis(250)),
        };
        assert!(err.to_string().contains("250ms"));
    }
}
