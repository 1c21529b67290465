//! HTTP transport layer for provider requests.
//!
//! Providers are called through the [`HttpTransport`] trait so adapters can
//! be exercised against the mock transport in tests without any network.

use crate::error::{GeocodeError, NetworkError, ProviderError};
use async_trait::async_trait;
use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// HTTP request to be sent.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// HTTP method.
    pub method: String,
    /// Request URL.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// Request body.
    pub body: Option<Bytes>,
}

impl HttpRequest {
    /// Create a new HTTP request.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Add a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set the request body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// HTTP response received.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        let name_lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_lowercase() == name_lower)
            .map(|(_, v)| v.as_str())
    }

    /// Deserialize the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, GeocodeError> {
        serde_json::from_slice(&self.body).map_err(|err| GeocodeError::Parse {
            message: format!("invalid JSON response: {}", err),
        })
    }

    /// A short body excerpt for error messages.
    pub fn body_snippet(&self) -> String {
        let text = String::from_utf8_lossy(&self.body);
        let mut snippet: String = text.chars().take(200).collect();
        if text.chars().count() > 200 {
            snippet.push_str("...");
        }
        snippet
    }
}

/// HTTP transport trait for making provider requests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send an HTTP request and return the response.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GeocodeError>;
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `request_timeout`.
    pub fn new(request_timeout: Duration) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("geocoding-resilience/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| {
                GeocodeError::Network(NetworkError::Connection {
                    message: format!("failed to build HTTP client: {}", err),
                })
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, GeocodeError> {
        let method = Method::from_bytes(request.method.as_bytes()).map_err(|_| {
            GeocodeError::Provider(ProviderError::Malformed {
                message: format!("invalid HTTP method: {}", request.method),
            })
        })?;

        debug!(method = %method, url = %request.url, "sending provider request");

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_reqwest_error)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(map_reqwest_error)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> GeocodeError {
    if err.is_timeout() {
        GeocodeError::Network(NetworkError::Timeout {
            elapsed: Duration::ZERO,
        })
    } else {
        GeocodeError::Network(NetworkError::Connection {
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_fields() {
        let request = HttpRequest::new("GET", "https://example.com/search")
            .with_header("accept", "application/json")
            .with_body("payload");

        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "https://example.com/search");
        assert_eq!(request.headers.get("accept").map(String::as_str), Some("application/json"));
        assert_eq!(request.body, Some(Bytes::from("payload")));
    }

    #[test]
    fn response_status_classification() {
        let ok = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        let err = HttpResponse {
            status: 503,
            headers: HashMap::new(),
            body: Bytes::new(),
        };
        assert!(ok.is_success());
        assert!(!err.is_success());
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        let response = HttpResponse {
            status: 200,
            headers,
            body: Bytes::new(),
        };
        assert_eq!(response.get_header("content-type"), Some("application/json"));
    }

    #[test]
    fn json_parse_errors_are_parse_errors() {
        let response = HttpResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from("not json"),
        };
        let result: Result<serde_json::Value, _> = response.json();
        assert!(matches!(result, Err(GeocodeError::Parse { .. })));
    }

    #[test]
    fn body_snippet_truncates_long_bodies() {
        let response = HttpResponse {
            status: 500,
            headers: HashMap::new(),
            body: Bytes::from("x".repeat(500)),
        };
        let snippet = response.body_snippet();
        assert_eq!(snippet.len(), 203);
        assert!(snippet.ends_with("..."));
    }
}
