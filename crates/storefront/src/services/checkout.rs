//! Checkout orchestration.
//!
//! A checkout runs in two halves around the customer's card confirmation:
//!
//! 1. [`CheckoutService::begin`] checks the store is open, re-verifies
//!    inventory, creates a payment intent for the order total, and commits a
//!    pending order that reserves the stock.
//! 2. The browser confirms the payment with the returned client secret.
//! 3. [`CheckoutService::complete`] asks the processor for the outcome,
//!    confirms or abandons the order, and notifies the team.
//!
//! [`CheckoutService::checkout`] runs all three in one call with a
//! [`PaymentConfirmer`] standing in for the browser.
//!
//! Nothing here retries. A failure is reported to the caller, who may start
//! again from a reconciled cart.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use nightowl_core::{
    Cart, CartLine, CustomerInfo, InventoryShortfall, NextOpening, OrderConfirmation, OrderId,
    OrderLine, OrderSnapshot, OrderStatus, OrderTotals, Price, PriceError, ProductId,
    ScheduleError, StoreStatus, store_status,
};

use super::{Notifier, OrderStore, PaymentConfirmer, PaymentProcessor, PaymentRequest, PaymentStatus};
use crate::db::RepositoryError;
use crate::settings::StoreSettings;

/// Errors a checkout can end in.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("store is closed, opens {} at {}", next_opening.day, next_opening.time.to_12_hour())]
    StoreClosed { next_opening: NextOpening },

    /// Some lines ask for more than is in stock.
    #[error("inventory changed for {} item(s)", .0.len())]
    InventoryChanged(Vec<InventoryShortfall>),

    #[error("payment setup failed: {0}")]
    PaymentSetupFailed(String),

    #[error("order could not be saved: {0}")]
    OrderCommitFailed(String),

    #[error("payment was not completed: {0}")]
    PaymentDeclined(String),

    #[error("payment status unavailable: {0}")]
    PaymentStatusUnavailable(String),

    #[error("payment does not belong to order {0}")]
    PaymentMismatch(OrderId),

    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {id} is already {status}")]
    OrderNotPending { id: OrderId, status: OrderStatus },

    #[error(transparent)]
    Store(#[from] RepositoryError),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    #[error(transparent)]
    Amount(#[from] PriceError),
}

/// A committed order awaiting payment confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub order_id: OrderId,
    pub payment_intent_id: String,
    pub client_secret: String,
    /// Charged amount in minor units.
    pub amount_minor: i64,
    pub totals: OrderTotals,
}

/// Runs checkouts against an order store, a payment processor, and a
/// notification channel.
pub struct CheckoutService<S, P, N> {
    store: S,
    payments: P,
    notifier: N,
    settings: Arc<StoreSettings>,
}

impl<S, P, N> CheckoutService<S, P, N>
where
    S: OrderStore,
    P: PaymentProcessor,
    N: Notifier,
{
    pub const fn new(store: S, payments: P, notifier: N, settings: Arc<StoreSettings>) -> Self {
        Self {
            store,
            payments,
            notifier,
            settings,
        }
    }

    /// Verify inventory, create a payment intent, and commit a pending order.
    ///
    /// # Errors
    ///
    /// - `EmptyCart` / `StoreClosed` before anything external is touched
    /// - `InventoryChanged` when stock is short, either at the check or in
    ///   the commit transaction
    /// - `PaymentSetupFailed` if the processor rejects the intent
    /// - `OrderCommitFailed` for any other commit failure; the intent is
    ///   cancelled first
    #[instrument(skip_all, fields(items = cart.item_count()))]
    pub async fn begin(
        &self,
        cart: &Cart,
        customer: &CustomerInfo,
        now: NaiveDateTime,
    ) -> Result<PendingCheckout, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if let StoreStatus::Closed { next_opening } = store_status(&self.settings.hours, now)? {
            return Err(CheckoutError::StoreClosed { next_opening });
        }

        let ids: Vec<ProductId> = cart.lines().iter().map(|line| line.product_id).collect();
        let available = self.store.available_quantities(&ids).await?;
        let shortfalls = find_shortfalls(cart.lines(), &available);
        if !shortfalls.is_empty() {
            tracing::info!(count = shortfalls.len(), "Cart exceeds current inventory");
            return Err(CheckoutError::InventoryChanged(shortfalls));
        }

        let totals = cart.totals(self.settings.min_order_value, self.settings.delivery_charge);
        let amount = Price::new(totals.total, self.settings.currency);
        let amount_minor = amount.to_minor_units()?;
        let lines: Vec<OrderLine> = cart.lines().iter().map(OrderLine::from).collect();

        let request = PaymentRequest {
            amount,
            amount_minor,
            customer,
            items: &lines,
        };
        let intent = self
            .payments
            .create_payment_intent(&request)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to create payment intent");
                CheckoutError::PaymentSetupFailed(e.to_string())
            })?;

        let snapshot = OrderSnapshot {
            customer: customer.clone(),
            lines,
            totals,
            payment_intent_id: intent.id.clone(),
            placed_at: now,
        };

        let order_id = match self.store.commit_order(&snapshot).await {
            Ok(id) => id,
            Err(err) => {
                self.cancel_intent(&intent.id).await;
                return Err(match err {
                    RepositoryError::InsufficientStock(shortfalls) => {
                        CheckoutError::InventoryChanged(shortfalls)
                    }
                    other => {
                        tracing::error!(error = %other, "Failed to commit order");
                        CheckoutError::OrderCommitFailed(other.to_string())
                    }
                });
            }
        };

        tracing::info!(order_id = %order_id, amount_minor, "Checkout started");

        Ok(PendingCheckout {
            order_id,
            payment_intent_id: intent.id,
            client_secret: intent.client_secret,
            amount_minor,
            totals,
        })
    }

    /// Settle a pending order from the processor's view of its payment.
    ///
    /// Completing an already-confirmed order returns its confirmation again
    /// without a second notification.
    ///
    /// # Errors
    ///
    /// - `OrderNotFound`, `PaymentMismatch`, or `OrderNotPending` for an
    ///   unknown, mismatched, or abandoned order
    /// - `PaymentStatusUnavailable` if the processor cannot be reached
    /// - `PaymentDeclined` unless the payment succeeded; a cancelled payment
    ///   also abandons the order and restocks
    #[instrument(skip(self, payment_intent_id))]
    pub async fn complete(
        &self,
        order_id: OrderId,
        payment_intent_id: &str,
        now: NaiveDateTime,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let order = self
            .store
            .load_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;

        if order.snapshot.payment_intent_id != payment_intent_id {
            return Err(CheckoutError::PaymentMismatch(order_id));
        }
        match order.status {
            OrderStatus::Pending => {}
            OrderStatus::Confirmed => return Ok(self.confirmation(order_id, now)),
            status @ OrderStatus::Abandoned => {
                return Err(CheckoutError::OrderNotPending {
                    id: order_id,
                    status,
                });
            }
        }

        let status = self
            .payments
            .payment_status(payment_intent_id)
            .await
            .map_err(|e| CheckoutError::PaymentStatusUnavailable(e.to_string()))?;

        match status {
            PaymentStatus::Succeeded => {
                if !self.store.mark_confirmed(order_id).await? {
                    return match self.current_status(order_id).await? {
                        OrderStatus::Confirmed => Ok(self.confirmation(order_id, now)),
                        status => Err(CheckoutError::OrderNotPending {
                            id: order_id,
                            status,
                        }),
                    };
                }
                tracing::info!(order_id = %order_id, "Order confirmed");
                self.notify(order_id, &order.snapshot).await;
                Ok(self.confirmation(order_id, now))
            }
            PaymentStatus::Canceled => {
                self.store.abandon_order(order_id).await?;
                tracing::info!(order_id = %order_id, "Payment cancelled, order abandoned");
                Err(CheckoutError::PaymentDeclined(format!("payment {status}")))
            }
            other => {
                tracing::info!(order_id = %order_id, status = ?other, "Payment not completed");
                Err(CheckoutError::PaymentDeclined(format!("payment {other}")))
            }
        }
    }

    /// Run a whole checkout, using `confirmer` in place of the browser.
    ///
    /// If confirmation fails the order is abandoned before returning.
    ///
    /// # Errors
    ///
    /// Any error from [`Self::begin`] or [`Self::complete`], or
    /// `PaymentDeclined` when the confirmer fails.
    pub async fn checkout<C: PaymentConfirmer>(
        &self,
        cart: &Cart,
        customer: &CustomerInfo,
        confirmer: &C,
        now: NaiveDateTime,
    ) -> Result<OrderConfirmation, CheckoutError> {
        let pending = self.begin(cart, customer, now).await?;

        if let Err(e) = confirmer.confirm(&pending).await {
            tracing::info!(order_id = %pending.order_id, error = %e, "Payment confirmation failed");
            if let Err(abandon_err) = self.abandon(pending.order_id).await {
                tracing::warn!(
                    order_id = %pending.order_id,
                    error = %abandon_err,
                    "Failed to abandon order after declined payment"
                );
            }
            return Err(CheckoutError::PaymentDeclined(e.to_string()));
        }

        self.complete(pending.order_id, &pending.payment_intent_id, now)
            .await
    }

    /// Cancel a pending order's payment and return its stock.
    ///
    /// # Errors
    ///
    /// `OrderNotFound` or `OrderNotPending`, or a store error.
    #[instrument(skip(self))]
    pub async fn abandon(&self, order_id: OrderId) -> Result<(), CheckoutError> {
        let order = self
            .store
            .load_order(order_id)
            .await?
            .ok_or(CheckoutError::OrderNotFound(order_id))?;
        if order.status != OrderStatus::Pending {
            return Err(CheckoutError::OrderNotPending {
                id: order_id,
                status: order.status,
            });
        }

        self.cancel_intent(&order.snapshot.payment_intent_id).await;

        if self.store.abandon_order(order_id).await? {
            Ok(())
        } else {
            Err(CheckoutError::OrderNotPending {
                id: order_id,
                status: self.current_status(order_id).await?,
            })
        }
    }

    fn confirmation(&self, order_id: OrderId, now: NaiveDateTime) -> OrderConfirmation {
        OrderConfirmation {
            order_id,
            expected_delivery_time: self.settings.delivery_window.expected_delivery(now),
        }
    }

    /// Re-read an order's status after it left `Pending` between our read
    /// and our write.
    async fn current_status(&self, order_id: OrderId) -> Result<OrderStatus, CheckoutError> {
        Ok(self
            .store
            .load_order(order_id)
            .await?
            .map_or(OrderStatus::Abandoned, |order| order.status))
    }

    async fn cancel_intent(&self, payment_intent_id: &str) {
        if let Err(e) = self.payments.cancel_payment_intent(payment_intent_id).await {
            tracing::warn!(
                payment_intent_id,
                error = %e,
                "Failed to cancel payment intent"
            );
        }
    }

    async fn notify(&self, order_id: OrderId, order: &OrderSnapshot) {
        if let Err(e) = self.notifier.notify_order(order_id, order).await {
            tracing::warn!(order_id = %order_id, error = %e, "Order notification failed");
        }
    }
}

/// Lines whose quantity exceeds availability. Missing products count as 0.
fn find_shortfalls(
    lines: &[CartLine],
    available: &HashMap<ProductId, u32>,
) -> Vec<InventoryShortfall> {
    lines
        .iter()
        .filter_map(|line| {
            let in_stock = available.get(&line.product_id).copied().unwrap_or(0);
            (line.quantity > in_stock).then(|| InventoryShortfall {
                product_id: line.product_id,
                name: line.name.clone(),
                requested: line.quantity,
                available: in_stock,
            })
        })
        .collect()
}
