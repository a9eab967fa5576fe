//! Store information route handlers.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use nightowl_core::{
    BoundingBox, CurrencyCode, DaySchedule, GeoPoint, StoreState, hours::weekday_name,
    store_status,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeliveryTerms {
    pub min_minutes: u32,
    pub max_minutes: u32,
    /// e.g. "30-45 minutes"
    pub window: String,
    pub note: Option<String>,
    pub min_order_value: Decimal,
    pub charge: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DayHoursView {
    pub day: &'static str,
    pub closed: bool,
    pub open: Option<String>,
    pub close: Option<String>,
    /// e.g. "7:30 AM - 5:40 PM", or "Closed"
    pub display: String,
}

#[derive(Debug, Serialize)]
pub struct StoreInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub currency: CurrencyCode,
    pub locality: String,
    pub delivery: DeliveryTerms,
    pub hours: Vec<DayHoursView>,
}

/// Store info, delivery terms, and weekly hours.
///
/// GET /api/store
#[instrument(skip(state))]
pub async fn info(State(state): State<AppState>) -> Json<StoreInfo> {
    let settings = state.settings();

    let hours = settings
        .hours
        .iter()
        .map(|(day, schedule)| match schedule {
            DaySchedule::Open(hours) => DayHoursView {
                day: weekday_name(day),
                closed: false,
                open: Some(hours.open.to_string()),
                close: Some(hours.close.to_string()),
                display: format!(
                    "{} - {}",
                    hours.open.to_12_hour(),
                    hours.close.to_12_hour()
                ),
            },
            DaySchedule::Closed => DayHoursView {
                day: weekday_name(day),
                closed: true,
                open: None,
                close: None,
                display: "Closed".to_string(),
            },
        })
        .collect();

    Json(StoreInfo {
        name: settings.name.clone(),
        title: settings.title.clone(),
        description: settings.description.clone(),
        support_email: settings.support_email.clone(),
        support_phone: settings.support_phone.clone(),
        currency: settings.currency,
        locality: settings.locality.clone(),
        delivery: DeliveryTerms {
            min_minutes: settings.delivery_window.min_minutes,
            max_minutes: settings.delivery_window.max_minutes,
            window: settings.delivery_window.to_string(),
            note: settings.delivery_note.clone(),
            min_order_value: settings.min_order_value,
            charge: settings.delivery_charge,
        },
        hours,
    })
}

#[derive(Debug, Serialize)]
pub struct NextOpeningView {
    /// "today", "tomorrow", or a weekday name
    pub day: String,
    pub time: String,
    pub time_display: String,
    pub seconds_until_open: u64,
    /// e.g. "8h 30m"
    pub countdown: String,
}

#[derive(Debug, Serialize)]
pub struct StoreStatusView {
    pub state: StoreState,
    pub is_open: bool,
    pub closing_time: Option<String>,
    pub closing_time_display: Option<String>,
    pub next_opening: Option<NextOpeningView>,
}

/// Whether the store is open right now.
///
/// GET /api/store/status
///
/// # Errors
///
/// Returns `AppError::Internal` if the schedule has no upcoming opening.
#[instrument(skip(state))]
pub async fn status(State(state): State<AppState>) -> Result<Json<StoreStatusView>> {
    let settings = state.settings();
    let status = store_status(&settings.hours, state.now())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let closing_time = status.closing_time();
    let next_opening = status.next_opening().map(|next| NextOpeningView {
        day: next.day.to_string(),
        time: next.time.to_string(),
        time_display: next.time.to_12_hour(),
        seconds_until_open: next.seconds_until_open,
        countdown: next.countdown(),
    });

    Ok(Json(StoreStatusView {
        state: status.state(settings.opening_soon),
        is_open: status.is_open(),
        closing_time: closing_time.map(|t| t.to_string()),
        closing_time_display: closing_time.map(|t| t.to_12_hour()),
        next_opening,
    }))
}

#[derive(Debug, Serialize)]
pub struct ServiceAreaView {
    pub polygon: Vec<GeoPoint>,
    pub centroid: GeoPoint,
    pub bounding_box: BoundingBox,
}

/// The delivery zone, for drawing a map.
///
/// GET /api/service-area
pub async fn service_area(State(state): State<AppState>) -> Json<ServiceAreaView> {
    let area = &state.settings().service_area;
    Json(ServiceAreaView {
        polygon: area.vertices().to_vec(),
        centroid: area.centroid(),
        bounding_box: area.bounding_box(),
    })
}
