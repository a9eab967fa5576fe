//! Slack integration for new-order notifications.
//!
//! - [`SlackClient`] posts messages via the Web API
//! - Block Kit types for building rich messages
//! - [`build_order_message`] renders an order summary

mod client;
mod error;
mod messages;
mod types;

pub use client::SlackClient;
pub use error::SlackError;
pub use messages::build_order_message;
pub use types::{Block, ContextElement, PlainText, PostMessageResponse, Text};
