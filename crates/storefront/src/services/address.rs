//! Delivery address verification.

use serde::Serialize;
use tracing::instrument;

use nightowl_core::{GeoPoint, ServiceArea, format_address};

use super::{GeocodeError, Geocoder};

/// Outcome of checking a customer's address.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressVerification {
    /// Shortened address suitable for drivers.
    pub formatted_address: String,
    pub location: GeoPoint,
    /// Whether the location is inside the delivery zone.
    pub serviceable: bool,
}

/// Geocode `input` and test the result against the service area.
///
/// # Errors
///
/// Returns `GeocodeError::AddressNotFound` for blank input or when the
/// geocoder has no match, and other `GeocodeError`s from the geocoder.
#[instrument(skip(geocoder, area))]
pub async fn verify_address<G: Geocoder>(
    geocoder: &G,
    area: &ServiceArea,
    locality: &str,
    input: &str,
) -> Result<AddressVerification, GeocodeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(GeocodeError::AddressNotFound(String::new()));
    }

    let resolved = geocoder.geocode(input).await?;
    let serviceable = area.contains(resolved.location);

    tracing::info!(serviceable, "Address verified");

    Ok(AddressVerification {
        formatted_address: format_address(&resolved.formatted_address, locality),
        location: resolved.location,
        serviceable,
    })
}
