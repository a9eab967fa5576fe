//! Store settings commands.

use std::path::PathBuf;

use chrono::{Local, NaiveDateTime};

use nightowl_core::{DaySchedule, StoreState, hours::weekday_name, store_status};
use nightowl_storefront::config::DEFAULT_STORE_CONFIG;
use nightowl_storefront::settings::{SettingsError, StoreSettings};

/// Resolve the settings path the same way the server does.
fn settings_path(path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| {
        dotenvy::dotenv().ok();
        std::env::var("STOREFRONT_STORE_CONFIG")
            .map_or_else(|_| PathBuf::from(DEFAULT_STORE_CONFIG), PathBuf::from)
    })
}

/// Load and validate a settings file, then log a summary of it.
///
/// # Errors
///
/// Returns `SettingsError` if the file is unreadable or invalid.
pub fn check_config(path: Option<PathBuf>) -> Result<(), SettingsError> {
    let path = settings_path(path);
    let settings = StoreSettings::load(&path)?;

    tracing::info!("{} is valid", path.display());
    tracing::info!("  Store: {} ({})", settings.name, settings.locality);
    tracing::info!(
        "  Delivery: {}, minimum order {}, charge {}",
        settings.delivery_window,
        settings.min_order_value,
        settings.delivery_charge
    );
    tracing::info!(
        "  Service area: {} vertices",
        settings.service_area.vertices().len()
    );
    for (day, schedule) in settings.hours.iter() {
        match schedule {
            DaySchedule::Open(hours) => tracing::info!(
                "  {:<9} {} - {}",
                weekday_name(day),
                hours.open.to_12_hour(),
                hours.close.to_12_hour()
            ),
            DaySchedule::Closed => tracing::info!("  {:<9} Closed", weekday_name(day)),
        }
    }
    Ok(())
}

/// Report whether the store is open at `at` (default: now, local time).
///
/// # Errors
///
/// Returns an error if the settings are invalid or have no upcoming opening.
pub fn status(
    path: Option<PathBuf>,
    at: Option<NaiveDateTime>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = StoreSettings::load(&settings_path(path))?;
    let now = at.unwrap_or_else(|| Local::now().naive_local());
    let status = store_status(&settings.hours, now)?;

    let state = match status.state(settings.opening_soon) {
        StoreState::Open => "open",
        StoreState::OpeningSoon => "opening soon",
        StoreState::Closed => "closed",
    };
    tracing::info!("{} is {state} at {}", settings.name, now.format("%a %Y-%m-%d %H:%M"));

    if let Some(close) = status.closing_time() {
        tracing::info!("  Closes at {}", close.to_12_hour());
    }
    if let Some(next) = status.next_opening() {
        tracing::info!(
            "  Opens {} at {} (in {})",
            next.day,
            next.time.to_12_hour(),
            next.countdown()
        );
    }
    Ok(())
}
