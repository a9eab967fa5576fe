//! NightOwl Core - Shared domain types and algorithms.
//!
//! This crate provides the types and pure logic used across all NightOwl
//! components:
//! - `storefront` - Public-facing delivery storefront (HTTP/JSON)
//! - `cli` - Command-line tools for migrations and store configuration
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP clients. Everything here is deterministic given
//! its inputs, which keeps the delivery rules testable in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, phone numbers, and statuses
//! - [`geo`] - Service-area polygon and the point-in-polygon test
//! - [`hours`] - Weekly opening hours and the open/closed scheduler
//! - [`cart`] - Cart line items and order totals (minimum-order top-up, delivery charge)
//! - [`product`] - Catalog products, stock levels, and catalog filtering
//! - [`order`] - Customer details, order snapshots, and delivery estimates
//! - [`address`] - Display formatting for geocoded addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod address;
pub mod cart;
pub mod geo;
pub mod hours;
pub mod order;
pub mod product;
pub mod types;

pub use address::format_address;
pub use cart::{Cart, CartLine, InventoryShortfall, OrderTotals, compute_totals};
pub use geo::{BoundingBox, GeoError, GeoPoint, ServiceArea, is_serviceable};
pub use hours::{
    DayHours, DaySchedule, NextOpening, OpeningDay, ScheduleError, StoreState, StoreStatus,
    TimeOfDay, WeeklyHours, store_status,
};
pub use order::{
    CustomerError, CustomerInfo, DeliveryWindow, OrderConfirmation, OrderLine, OrderSnapshot,
    summarize_items,
};
pub use product::{CatalogFilter, Product, StockLevel};
pub use types::*;
