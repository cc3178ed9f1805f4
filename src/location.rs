//! Footer location lookup
//!
//! Obtains a one-shot position and reverse-geocodes it into city, country
//! and postal code for display.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use url::Url;

use crate::{Error, Result};

/// Request timeout for position and geocoding lookups
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Placeholder for fields the geocoder did not return
pub const NOT_AVAILABLE: &str = "Not available";

const FETCH_FAILED: &str = "Failed to fetch location details.";

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

/// Failure reported by a position source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    PermissionDenied,
    Unavailable,
    Timeout,
    Other,
}

impl PositionError {
    /// User-facing message for the footer
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "Location permission denied.",
            Self::Unavailable => "Location unavailable.",
            Self::Timeout => "Location request timed out.",
            Self::Other => "Failed to get location.",
        }
    }
}

/// Source of the device's current position
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self) -> std::result::Result<Position, PositionError>;
}

/// Position supplied up front, e.g. from command-line flags
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Option<Position>);

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> std::result::Result<Position, PositionError> {
        self.0.ok_or(PositionError::Unavailable)
    }
}

/// Resolved location shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationDetails {
    pub city: String,
    pub country: String,
    pub pincode: String,
}

impl LocationDetails {
    /// Build from a geocoder response, substituting `Not available` for
    /// missing or empty fields
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        Self {
            city: field(value, "city"),
            country: field(value, "country"),
            pincode: field(value, "pincode"),
        }
    }
}

fn field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) if n.as_f64() != Some(0.0) => n.to_string(),
        _ => NOT_AVAILABLE.to_string(),
    }
}

/// Reverse-geocoding client
#[derive(Clone)]
pub struct LocationLookup {
    client: reqwest::Client,
    base_url: Url,
}

impl LocationLookup {
    /// Create a lookup against `base_url`
    ///
    /// # Errors
    ///
    /// Returns error if the URL is invalid or the HTTP client cannot be built
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid geocode URL {base_url}: {e}")))?;
        let client = reqwest::Client::builder().timeout(LOOKUP_TIMEOUT).build()?;
        Ok(Self { client, base_url })
    }

    /// Resolve `position` into location details
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response is not JSON
    pub async fn reverse_geocode(&self, position: Position) -> Result<LocationDetails> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::Config(format!("cannot use {} as a base URL", self.base_url)))?;
            segments.pop_if_empty().push("introduce");
        }
        url.query_pairs_mut()
            .append_pair("lat", &position.latitude.to_string())
            .append_pair("lon", &position.longitude.to_string());

        tracing::debug!(url = %url, "reverse geocoding");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Location(format!("geocoder returned {status}")));
        }
        let body: Value = response.json().await?;
        Ok(LocationDetails::from_json(&body))
    }
}

/// Run the footer lookup, yielding either details or the message to display
///
/// # Errors
///
/// Returns the user-facing message when the position or lookup fails
pub async fn locate(
    source: &dyn PositionSource,
    lookup: &LocationLookup,
) -> std::result::Result<LocationDetails, String> {
    let position = source
        .current_position()
        .await
        .map_err(|e| e.message().to_string())?;

    lookup.reverse_geocode(position).await.map_err(|e| {
        tracing::warn!(error = %e, "location lookup failed");
        FETCH_FAILED.to_string()
    })
}
