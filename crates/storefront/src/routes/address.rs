//! Address verification route handler.

use axum::{Json, extract::State};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use nightowl_core::CustomerInfo;

use crate::error::{Result, add_breadcrumb};
use crate::models::{VerifiedCustomer, keys};
use crate::services::address::{AddressVerification, verify_address};
use crate::state::AppState;

/// Delivery details entered at checkout.
#[derive(Debug, Deserialize)]
pub struct VerifyAddressRequest {
    pub name: String,
    pub phone: String,
    pub address: String,
    pub instructions: Option<String>,
}

/// Validate the customer's details and geocode their address.
///
/// POST /api/address/verify
///
/// A successful lookup is remembered in the session with the formatted
/// address, even when it falls outside the delivery zone, so the client can
/// show where it landed. Checkout only accepts serviceable addresses.
///
/// # Errors
///
/// `Customer` for invalid details, `Geocode` when the address is not found
/// or the geocoder is unreachable.
#[instrument(skip(state, session, request))]
pub async fn verify(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<VerifyAddressRequest>,
) -> Result<Json<AddressVerification>> {
    let mut customer = CustomerInfo::new(
        &request.name,
        &request.phone,
        &request.address,
        request.instructions.as_deref(),
    )?;

    let settings = state.settings();
    let verification = verify_address(
        state.geocoder(),
        &settings.service_area,
        &settings.locality,
        &customer.address,
    )
    .await?;

    customer.address.clone_from(&verification.formatted_address);
    session
        .insert(
            keys::CUSTOMER,
            VerifiedCustomer {
                customer,
                location: verification.location,
                serviceable: verification.serviceable,
            },
        )
        .await?;

    add_breadcrumb(
        "checkout",
        "Address verified",
        Some(&[("serviceable", if verification.serviceable { "yes" } else { "no" })]),
    );

    Ok(Json(verification))
}
