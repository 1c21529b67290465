//! Paid-provider adapter (commercial geocoder with daily-quota tracking).

use crate::adapters::ProviderAdapter;
use crate::error::{GeocodeError, ProviderError};
use crate::resilience::DailyQuota;
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{
    AddressComponents, GeocodeResult, MatchType, Precision, ProviderTier,
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Adapter for a commercial geocoding service.
///
/// Tracks a local daily usage counter so quota exhaustion is detected
/// before spending a network call; provider-reported quota breaches are
/// surfaced the same way.
pub struct PaidProviderAdapter {
    transport: Arc<dyn HttpTransport>,
    endpoint: Url,
    api_key: SecretString,
    quota: Option<DailyQuota>,
}

impl PaidProviderAdapter {
    /// Create an adapter against the given geocode endpoint.
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: Url, api_key: SecretString) -> Self {
        Self {
            transport,
            endpoint,
            api_key,
            quota: None,
        }
    }

    /// Cap outbound requests at `quota` per UTC day.
    pub fn with_daily_quota(mut self, quota: u64) -> Self {
        self.quota = Some(DailyQuota::new(quota));
        self
    }

    /// Requests charged against today's quota.
    pub fn used_today(&self) -> u64 {
        self.quota.as_ref().map_or(0, DailyQuota::used_today)
    }

    /// Charge one request against the daily quota, failing when exhausted.
    fn charge_quota(&self) -> Result<(), GeocodeError> {
        match &self.quota {
            Some(quota) => quota.charge(),
            None => Ok(()),
        }
    }

    fn build_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("address", address)
            .append_pair("key", self.api_key.expose_secret());
        url
    }
}

#[async_trait]
impl ProviderAdapter for PaidProviderAdapter {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Paid
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        self.charge_quota()?;

        let url = self.build_url(address);
        let request = HttpRequest::new("GET", url.as_str());

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(GeocodeError::Provider(ProviderError::HttpStatus {
                status: response.status,
                message: response.body_snippet(),
            }));
        }

        let payload: PaidResponse = response.json()?;
        match payload.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound),
            "OVER_QUERY_LIMIT" | "OVER_DAILY_LIMIT" => {
                return Err(GeocodeError::QuotaExceeded {
                    message: payload
                        .error_message
                        .unwrap_or_else(|| "provider reported quota breach".to_string()),
                })
            }
            other => {
                return Err(GeocodeError::Provider(ProviderError::Malformed {
                    message: format!(
                        "unexpected provider status {}: {}",
                        other,
                        payload.error_message.unwrap_or_default()
                    ),
                }))
            }
        }

        let top = payload
            .results
            .into_iter()
            .next()
            .ok_or(GeocodeError::NotFound)?;

        let precision = precision_from_location_type(top.geometry.location_type.as_deref());
        let match_type = if top.partial_match {
            MatchType::Partial
        } else {
            MatchType::Exact
        };

        let mut builder = GeocodeResult::builder(ProviderTier::Paid)
            .coordinates(top.geometry.location.lat, top.geometry.location.lng)
            .precision(precision)
            .match_type(match_type)
            .components(extract_components(&top.address_components));
        if let Some(formatted) = top.formatted_address {
            builder = builder.formatted_address(formatted);
        }
        builder.build()
    }
}

impl std::fmt::Debug for PaidProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaidProviderAdapter")
            .field("endpoint", &self.endpoint.as_str())
            .field("daily_quota", &self.quota.as_ref().map(DailyQuota::limit))
            // api_key intentionally omitted
            .finish_non_exhaustive()
    }
}

fn precision_from_location_type(location_type: Option<&str>) -> Precision {
    match location_type {
        Some("ROOFTOP") => Precision::Rooftop,
        Some("RANGE_INTERPOLATED") => Precision::Interpolated,
        Some("GEOMETRIC_CENTER") | Some("APPROXIMATE") => Precision::Approximate,
        _ => Precision::Partial,
    }
}

fn extract_components(components: &[PaidComponent]) -> AddressComponents {
    let find = |kind: &str| {
        components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
            .map(|c| c.long_name.clone())
    };

    AddressComponents {
        street_number: find("street_number"),
        street_name: find("route"),
        city: find("locality"),
        state: find("administrative_area_level_1"),
        postal_code: find("postal_code"),
        country: find("country"),
    }
}

#[derive(Debug, Deserialize)]
struct PaidResponse {
    status: String,
    #[serde(default)]
    results: Vec<PaidResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaidResult {
    #[serde(default)]
    formatted_address: Option<String>,
    geometry: PaidGeometry,
    #[serde(default)]
    partial_match: bool,
    #[serde(default)]
    address_components: Vec<PaidComponent>,
}

#[derive(Debug, Deserialize)]
struct PaidGeometry {
    location: PaidLocation,
    #[serde(default)]
    location_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaidLocation {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct PaidComponent {
    long_name: String,
    #[serde(default)]
    types: Vec<String>,
}
