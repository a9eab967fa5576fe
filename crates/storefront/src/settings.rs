//! Store settings loaded from a YAML file.
//!
//! Business settings (opening hours, delivery area, pricing rules) change
//! with the business rather than the deployment, so they live in a checked-in
//! file instead of environment variables. The file is parsed once at startup
//! into a validated [`StoreSettings`]; any error aborts startup.
//!
//! ```yaml
//! name: NightOwl
//! locality: Akaroa
//! currency: nzd
//! delivery:
//!   min_minutes: 30
//!   max_minutes: 45
//!   min_order_value: "10.00"
//!   charge: "10.00"
//! hours:
//!   monday: { open: "07:30", close: "17:40" }
//!   sunday: closed
//! service_area:
//!   - { lat: -43.817, lng: 172.948 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use nightowl_core::{CurrencyCode, DeliveryWindow, GeoError, GeoPoint, ServiceArea, WeeklyHours};

/// Default "opening soon" window.
const DEFAULT_OPENING_SOON_MINUTES: u64 = 30;

/// Default low-stock badge threshold.
const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 10;

/// Errors loading or validating the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid store settings: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid service area: {0}")]
    ServiceArea(#[from] GeoError),
    #[error("delivery window minimum ({min}) exceeds maximum ({max})")]
    DeliveryWindow { min: u32, max: u32 },
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),
}

/// Validated store settings shared by every request.
#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub name: String,
    pub title: String,
    pub description: String,
    pub support_email: Option<String>,
    pub support_phone: Option<String>,
    pub currency: CurrencyCode,
    /// Appended to formatted addresses (e.g. "Akaroa").
    pub locality: String,
    pub delivery_window: DeliveryWindow,
    /// Free text shown next to the delivery window ("usually quicker").
    pub delivery_note: Option<String>,
    pub min_order_value: Decimal,
    pub delivery_charge: Decimal,
    pub low_stock_threshold: u32,
    pub show_out_of_stock: bool,
    /// Closed stores opening within this window report `OPENING_SOON`.
    pub opening_soon: Duration,
    pub hours: WeeklyHours,
    pub service_area: ServiceArea,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    name: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    support_email: Option<String>,
    #[serde(default)]
    support_phone: Option<String>,
    #[serde(default)]
    currency: CurrencyCode,
    locality: String,
    delivery: DeliveryFile,
    #[serde(default)]
    catalog: CatalogFile,
    #[serde(default = "default_opening_soon_minutes")]
    opening_soon_minutes: u64,
    hours: WeeklyHours,
    service_area: Vec<GeoPoint>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DeliveryFile {
    min_minutes: u32,
    max_minutes: u32,
    #[serde(default)]
    note: Option<String>,
    min_order_value: Decimal,
    charge: Decimal,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default = "default_low_stock_threshold")]
    low_stock_threshold: u32,
    #[serde(default)]
    show_out_of_stock: bool,
}

impl Default for CatalogFile {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            show_out_of_stock: false,
        }
    }
}

const fn default_opening_soon_minutes() -> u64 {
    DEFAULT_OPENING_SOON_MINUTES
}

const fn default_low_stock_threshold() -> u32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl StoreSettings {
    /// Read and validate a settings file.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the file cannot be read or is invalid.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Parse and validate settings from YAML text.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` for malformed YAML, invalid hours, a
    /// degenerate service area, or inconsistent delivery values.
    pub fn from_yaml(content: &str) -> Result<Self, SettingsError> {
        let file: SettingsFile = serde_yaml::from_str(content)?;
        let delivery = file.delivery;

        let delivery_window = DeliveryWindow::new(delivery.min_minutes, delivery.max_minutes)
            .ok_or(SettingsError::DeliveryWindow {
                min: delivery.min_minutes,
                max: delivery.max_minutes,
            })?;
        if delivery.min_order_value.is_sign_negative() {
            return Err(SettingsError::NegativeAmount("delivery.min_order_value"));
        }
        if delivery.charge.is_sign_negative() {
            return Err(SettingsError::NegativeAmount("delivery.charge"));
        }

        let service_area = ServiceArea::new(file.service_area)?;

        Ok(Self {
            title: file.title.unwrap_or_else(|| file.name.clone()),
            name: file.name,
            description: file.description,
            support_email: file.support_email,
            support_phone: file.support_phone,
            currency: file.currency,
            locality: file.locality,
            delivery_window,
            delivery_note: delivery.note,
            min_order_value: delivery.min_order_value,
            delivery_charge: delivery.charge,
            low_stock_threshold: file.catalog.low_stock_threshold,
            show_out_of_stock: file.catalog.show_out_of_stock,
            opening_soon: Duration::from_secs(file.opening_soon_minutes * 60),
            hours: file.hours,
            service_area,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Weekday;
    use nightowl_core::DaySchedule;

    use super::*;

    const MINIMAL: &str = r#"
name: NightOwl
locality: Akaroa
delivery:
  min_minutes: 30
  max_minutes: 45
  min_order_value: "10.00"
  charge: "10.00"
hours:
  monday: { open: "07:30", close: "17:40" }
  tuesday: { open: "15:08", close: "23:00" }
  wednesday: { open: "08:00", close: "23:00" }
  thursday: { open: "14:37", close: "21:40" }
  friday: { open: "08:08", close: "00:00" }
  saturday: { open: "05:46", close: "22:30" }
  sunday: closed
service_area:
  - { lat: -43.817, lng: 172.948 }
  - { lat: -43.790, lng: 172.960 }
  - { lat: -43.790, lng: 172.985 }
  - { lat: -43.812, lng: 172.988 }
"#;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let settings = StoreSettings::from_yaml(MINIMAL).unwrap();
        assert_eq!(settings.title, "NightOwl");
        assert_eq!(settings.currency, CurrencyCode::NZD);
        assert_eq!(settings.low_stock_threshold, 10);
        assert!(!settings.show_out_of_stock);
        assert_eq!(settings.opening_soon, Duration::from_secs(1800));
        assert_eq!(settings.min_order_value, Decimal::new(10, 0));
        assert_eq!(settings.hours.get(Weekday::Sun), DaySchedule::Closed);
        assert_eq!(settings.service_area.vertices().len(), 4);
    }

    #[test]
    fn test_degenerate_service_area_is_rejected() {
        let yaml = MINIMAL.replace(
            "  - { lat: -43.790, lng: 172.985 }\n  - { lat: -43.812, lng: 172.988 }\n",
            "",
        );
        assert!(matches!(
            StoreSettings::from_yaml(&yaml),
            Err(SettingsError::ServiceArea(GeoError::InvalidPolygon(2)))
        ));
    }

    #[test]
    fn test_missing_day_is_rejected() {
        let yaml = MINIMAL.replace("  sunday: closed\n", "");
        let err = StoreSettings::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("sunday"), "{err}");
    }

    #[test]
    fn test_inverted_delivery_window_is_rejected() {
        let yaml = MINIMAL.replace("max_minutes: 45", "max_minutes: 15");
        assert!(matches!(
            StoreSettings::from_yaml(&yaml),
            Err(SettingsError::DeliveryWindow { min: 30, max: 15 })
        ));
    }

    #[test]
    fn test_negative_charge_is_rejected() {
        let yaml = MINIMAL.replace("charge: \"10.00\"", "charge: \"-1\"");
        assert!(matches!(
            StoreSettings::from_yaml(&yaml),
            Err(SettingsError::NegativeAmount("delivery.charge"))
        ));
    }

    #[test]
    fn test_bundled_store_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/store.yaml");
        let settings = StoreSettings::load(&path).unwrap();
        assert_eq!(settings.name, "NightOwl");
        assert_eq!(settings.locality, "Akaroa");
    }
}
