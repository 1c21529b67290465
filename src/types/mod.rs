//! Core types for the geocoding resilience layer.
//!
//! The central type is [`GeocodeResult`], the normalized, quality-annotated
//! outcome of one geocode attempt. Results are constructed through validating
//! constructors and treated as immutable once returned.

use crate::error::GeocodeError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// The tier that produced a geocode result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderTier {
    /// Local cache hit.
    Cache,
    /// Free, rate-limited provider.
    Free,
    /// Paid fallback provider.
    Paid,
    /// No tier produced a result.
    None,
}

impl std::fmt::Display for ProviderTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProviderTier::Cache => "cache",
            ProviderTier::Free => "free",
            ProviderTier::Paid => "paid",
            ProviderTier::None => "none",
        };
        write!(f, "{}", name)
    }
}

/// Outcome classification of a geocode attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeocodeStatus {
    /// Coordinates resolved with usable precision.
    Success,
    /// Coordinates resolved, but only to a partial-precision match.
    Partial,
    /// No tier produced coordinates.
    Failed,
    /// Every viable tier was rejected by its local rate limiter.
    RateLimited,
    /// The provider's usage quota is exhausted.
    QuotaExceeded,
    /// Every viable tier was rejected by an open circuit breaker.
    CircuitOpen,
}

impl GeocodeStatus {
    /// Returns true if the result carries coordinates.
    pub fn is_resolved(&self) -> bool {
        matches!(self, GeocodeStatus::Success | GeocodeStatus::Partial)
    }

    /// Terminal status for a tier error.
    pub fn from_error(error: &GeocodeError) -> Self {
        match error {
            GeocodeError::CircuitOpen { .. } => GeocodeStatus::CircuitOpen,
            GeocodeError::RateLimited { .. } => GeocodeStatus::RateLimited,
            GeocodeError::QuotaExceeded { .. } => GeocodeStatus::QuotaExceeded,
            _ => GeocodeStatus::Failed,
        }
    }

    /// Specificity used to pick the terminal status when every tier fails.
    ///
    /// Outcomes of tiers that actually answered (quota breaches, provider
    /// failures) outrank pre-call rejections, so a paid-tier failure is
    /// reported over an open free-tier circuit. Within each group the order
    /// is the informativeness order: circuit-open over rate-limited, quota
    /// over a generic failure.
    pub(crate) fn specificity(&self) -> u8 {
        match self {
            GeocodeStatus::QuotaExceeded => 5,
            GeocodeStatus::Failed => 4,
            GeocodeStatus::CircuitOpen => 3,
            GeocodeStatus::RateLimited => 2,
            GeocodeStatus::Success | GeocodeStatus::Partial => 0,
        }
    }
}

/// Qualitative accuracy tier of a geocoded location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Precision {
    /// Exact building-level match.
    Rooftop,
    /// Interpolated along a street segment.
    Interpolated,
    /// Centroid of a larger area (neighborhood, city).
    Approximate,
    /// Only part of the address matched.
    Partial,
}

impl Precision {
    /// Fixed confidence mapping so scores are comparable across providers.
    pub fn confidence(&self) -> f64 {
        match self {
            Precision::Rooftop => 0.95,
            Precision::Interpolated => 0.85,
            Precision::Approximate => 0.65,
            Precision::Partial => 0.45,
        }
    }
}

/// How closely the provider's match corresponds to the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// The full address matched.
    Exact,
    /// Only some address components matched.
    Partial,
    /// The provider matched on a fuzzy or corrected form of the query.
    Fuzzy,
}

/// Structured address components, all optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponents {
    /// Street number.
    pub street_number: Option<String>,
    /// Street name.
    pub street_name: Option<String>,
    /// City or locality.
    pub city: Option<String>,
    /// State, province, or region.
    pub state: Option<String>,
    /// Postal or ZIP code.
    pub postal_code: Option<String>,
    /// Country.
    pub country: Option<String>,
}

impl AddressComponents {
    /// Returns true if no component is populated.
    pub fn is_empty(&self) -> bool {
        self.street_number.is_none()
            && self.street_name.is_none()
            && self.city.is_none()
            && self.state.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
    }
}

/// Normalized, quality-annotated outcome of one geocode attempt.
///
/// Invariants, enforced at construction:
/// - `status.is_resolved()` implies latitude and longitude are present
/// - `confidence_score` is always within `[0, 1]`
/// - `cached == true` implies `provider == ProviderTier::Cache`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeResult {
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Provider-formatted address of the match.
    pub formatted_address: Option<String>,
    /// Normalized match quality in `[0, 1]`.
    pub confidence_score: f64,
    /// The tier that produced this result.
    pub provider: ProviderTier,
    /// Outcome classification.
    pub status: GeocodeStatus,
    /// Structured address components.
    pub components: AddressComponents,
    /// Accuracy tier of the match, when resolved.
    pub precision: Option<Precision>,
    /// Match closeness, when resolved.
    pub match_type: Option<MatchType>,
    /// Wall-clock duration of the resolution in milliseconds.
    pub response_time_ms: u64,
    /// True if this result was served from the cache tier.
    pub cached: bool,
}

impl GeocodeResult {
    /// Start building a resolved result for the given provider tier.
    pub fn builder(provider: ProviderTier) -> GeocodeResultBuilder {
        GeocodeResultBuilder::new(provider)
    }

    /// Construct a terminal failure result with zero confidence.
    pub fn failure(status: GeocodeStatus, provider: ProviderTier) -> Self {
        debug_assert!(!status.is_resolved(), "failure result with resolved status");
        Self {
            latitude: None,
            longitude: None,
            formatted_address: None,
            confidence_score: 0.0,
            provider,
            status,
            components: AddressComponents::default(),
            precision: None,
            match_type: None,
            response_time_ms: 0,
            cached: false,
        }
    }

    /// Re-brand a stored result as a cache hit.
    ///
    /// Consumes the stored value and returns a fresh one; results are never
    /// mutated in place.
    pub fn into_cached(self) -> Self {
        Self {
            provider: ProviderTier::Cache,
            cached: true,
            ..self
        }
    }

    /// Return a copy of this result with the measured resolution time.
    pub fn with_response_time(self, response_time_ms: u64) -> Self {
        Self {
            response_time_ms,
            ..self
        }
    }

    /// Returns the coordinates when the result is resolved.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

/// Builder for resolved [`GeocodeResult`] values.
///
/// `build()` validates the coordinates-present invariant and derives status
/// and confidence from the precision table when not given explicitly.
#[derive(Debug)]
pub struct GeocodeResultBuilder {
    provider: ProviderTier,
    coordinates: Option<(f64, f64)>,
    formatted_address: Option<String>,
    confidence: Option<f64>,
    components: AddressComponents,
    precision: Option<Precision>,
    match_type: Option<MatchType>,
}

impl GeocodeResultBuilder {
    fn new(provider: ProviderTier) -> Self {
        Self {
            provider,
            coordinates: None,
            formatted_address: None,
            confidence: None,
            components: AddressComponents::default(),
            precision: None,
            match_type: None,
        }
    }

    /// Set the resolved coordinates.
    pub fn coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some((latitude, longitude));
        self
    }

    /// Set the provider-formatted address.
    pub fn formatted_address(mut self, address: impl Into<String>) -> Self {
        self.formatted_address = Some(address.into());
        self
    }

    /// Override the confidence score (clamped to `[0, 1]` on build).
    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the structured address components.
    pub fn components(mut self, components: AddressComponents) -> Self {
        self.components = components;
        self
    }

    /// Set the match precision.
    pub fn precision(mut self, precision: Precision) -> Self {
        self.precision = Some(precision);
        self
    }

    /// Set the match type.
    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = Some(match_type);
        self
    }

    /// Validate and build the result.
    ///
    /// Fails with a parse error when coordinates are missing or outside
    /// valid ranges, since that means the provider response could not be
    /// normalized into a resolved result.
    pub fn build(self) -> Result<GeocodeResult, GeocodeError> {
        let (latitude, longitude) = self.coordinates.ok_or_else(|| GeocodeError::Parse {
            message: "resolved result is missing coordinates".to_string(),
        })?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeocodeError::Parse {
                message: format!("coordinates out of range: ({}, {})", latitude, longitude),
            });
        }

        let status = match self.precision {
            Some(Precision::Partial) => GeocodeStatus::Partial,
            _ => GeocodeStatus::Success,
        };

        let confidence = self
            .confidence
            .or_else(|| self.precision.map(|p| p.confidence()))
            .unwrap_or(0.5)
            .clamp(0.0, 1.0);

        Ok(GeocodeResult {
            latitude: Some(latitude),
            longitude: Some(longitude),
            formatted_address: self.formatted_address,
            confidence_score: confidence,
            provider: self.provider,
            status,
            components: self.components,
            precision: self.precision,
            match_type: self.match_type,
            response_time_ms: 0,
            cached: false,
        })
    }
}

/// Compute the stable cache key for an address.
///
/// The address is canonicalized (lowercased, whitespace collapsed) and
/// hashed so the key is insensitive to spacing and casing differences.
pub fn cache_key(address: &str) -> String {
    let canonical = address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    hex::encode(hasher.finalize())
}
