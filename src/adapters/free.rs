//! Free-provider adapter (OpenStreetMap-style search service).

use crate::adapters::ProviderAdapter;
use crate::error::{GeocodeError, ProviderError};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::{
    AddressComponents, GeocodeResult, MatchType, Precision, ProviderTier,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// Adapter for an OpenStreetMap-style free geocoding service.
///
/// Issues a `search` query with JSON output and maps the service's
/// `place_rank` vocabulary onto the shared precision model.
pub struct FreeProviderAdapter {
    transport: Arc<dyn HttpTransport>,
    endpoint: Url,
}

impl FreeProviderAdapter {
    /// Create an adapter against the given search endpoint.
    pub fn new(transport: Arc<dyn HttpTransport>, endpoint: Url) -> Self {
        Self {
            transport,
            endpoint,
        }
    }

    fn build_url(&self, address: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", address)
            .append_pair("format", "jsonv2")
            .append_pair("limit", "1")
            .append_pair("addressdetails", "1");
        url
    }
}

#[async_trait]
impl ProviderAdapter for FreeProviderAdapter {
    fn tier(&self) -> ProviderTier {
        ProviderTier::Free
    }

    async fn geocode(&self, address: &str) -> Result<GeocodeResult, GeocodeError> {
        let url = self.build_url(address);
        let request = HttpRequest::new("GET", url.as_str())
            .with_header("accept", "application/json");

        let response = self.transport.send(request).await?;
        if !response.is_success() {
            return Err(GeocodeError::Provider(ProviderError::HttpStatus {
                status: response.status,
                message: response.body_snippet(),
            }));
        }

        let places: Vec<OsmPlace> = response.json()?;
        let place = places.into_iter().next().ok_or(GeocodeError::NotFound)?;

        let latitude: f64 = place.lat.parse().map_err(|_| GeocodeError::Parse {
            message: format!("invalid latitude: {}", place.lat),
        })?;
        let longitude: f64 = place.lon.parse().map_err(|_| GeocodeError::Parse {
            message: format!("invalid longitude: {}", place.lon),
        })?;

        let precision = precision_from_rank(place.place_rank);
        let match_type = match precision {
            Precision::Rooftop => MatchType::Exact,
            Precision::Interpolated => MatchType::Exact,
            Precision::Approximate => MatchType::Partial,
            Precision::Partial => MatchType::Fuzzy,
        };

        let mut builder = GeocodeResult::builder(ProviderTier::Free)
            .coordinates(latitude, longitude)
            .precision(precision)
            .match_type(match_type)
            .components(place.address.unwrap_or_default().into_components());
        if let Some(display_name) = place.display_name {
            builder = builder.formatted_address(display_name);
        }
        builder.build()
    }
}

impl std::fmt::Debug for FreeProviderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeProviderAdapter")
            .field("endpoint", &self.endpoint.as_str())
            .finish_non_exhaustive()
    }
}

/// OSM `place_rank` mapped onto the shared precision model. Rank 30 is a
/// building, 26-29 a road segment, 16-25 a settlement or district.
fn precision_from_rank(place_rank: u32) -> Precision {
    match place_rank {
        30.. => Precision::Rooftop,
        26..=29 => Precision::Interpolated,
        16..=25 => Precision::Approximate,
        _ => Precision::Partial,
    }
}

#[derive(Debug, Deserialize)]
struct OsmPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    place_rank: u32,
    #[serde(default)]
    address: Option<OsmAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct OsmAddress {
    #[serde(default)]
    house_number: Option<String>,
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    postcode: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl OsmAddress {
    fn into_components(self) -> AddressComponents {
        AddressComponents {
            street_number: self.house_number,
            street_name: self.road,
            city: self.city.or(self.town).or(self.village),
            state: self.state,
            postal_code: self.postcode,
            country: self.country,
        }
    }
}
