//! Order notifications.

use thiserror::Error;
use tracing::instrument;

use nightowl_core::{CurrencyCode, OrderId, OrderSnapshot};

use super::Notifier;
use crate::slack::{SlackClient, SlackError, build_order_message};

/// A notification could not be delivered.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error(transparent)]
    Slack(#[from] SlackError),
}

/// Posts order summaries to Slack.
///
/// Without Slack credentials the notifier is disabled and every
/// notification succeeds without sending anything.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Option<SlackClient>,
    currency: CurrencyCode,
}

impl SlackNotifier {
    #[must_use]
    pub const fn new(client: Option<SlackClient>, currency: CurrencyCode) -> Self {
        Self { client, currency }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.client.is_some()
    }
}

impl Notifier for SlackNotifier {
    #[instrument(skip(self, order))]
    async fn notify_order(
        &self,
        order_id: OrderId,
        order: &OrderSnapshot,
    ) -> Result<(), NotificationError> {
        let Some(client) = &self.client else {
            tracing::debug!("Slack not configured, skipping order notification");
            return Ok(());
        };

        if !client.is_member().await? {
            return Err(SlackError::NotInChannel(client.channel().to_string()).into());
        }

        let blocks = build_order_message(order_id, order, self.currency.symbol());
        let fallback = format!("New Order #{order_id}");
        client.post_message(blocks, Some(&fallback)).await?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use nightowl_core::{CustomerInfo, OrderTotals};
    use rust_decimal::Decimal;

    use super::*;

    #[tokio::test]
    async fn test_disabled_notifier_succeeds_without_sending() {
        let notifier = SlackNotifier::new(None, CurrencyCode::NZD);
        assert!(!notifier.is_enabled());

        let order = OrderSnapshot {
            customer: CustomerInfo::new("Sam", "03 304 7000", "1 Beach Rd", None).unwrap(),
            lines: vec![],
            totals: OrderTotals {
                subtotal: Decimal::ZERO,
                top_up: Decimal::new(10, 0),
                delivery_charge: Decimal::new(10, 0),
                total: Decimal::new(20, 0),
            },
            payment_intent_id: "pi_test".to_string(),
            placed_at: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        };
        notifier.notify_order(OrderId::new(1), &order).await.unwrap();
    }
}
