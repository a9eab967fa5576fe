//! Checkout route handlers.
//!
//! The browser drives payment between `begin` and `confirm`: it receives the
//! client secret, confirms the card with the processor, then calls back here
//! so the order can be settled.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;
use tracing::instrument;

use nightowl_core::{Cart, OrderConfirmation, OrderId, OrderTotals};

use super::cart::{load_cart, save_cart};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::{PendingOrder, VerifiedCustomer, keys};
use crate::services::CheckoutError;
use crate::state::AppState;

/// What the browser needs to confirm payment.
#[derive(Debug, Serialize)]
pub struct CheckoutStarted {
    pub order_id: OrderId,
    pub payment_intent_id: String,
    pub client_secret: String,
    pub amount_minor: i64,
    pub totals: OrderTotals,
}

#[derive(Debug, Serialize)]
pub struct OrderAbandoned {
    pub order_id: OrderId,
}

async fn pending_order(session: &Session) -> Result<PendingOrder> {
    session
        .get::<PendingOrder>(keys::PENDING_ORDER)
        .await?
        .ok_or_else(|| AppError::BadRequest("No checkout in progress".to_string()))
}

/// Start a checkout for the session's cart.
///
/// POST /api/checkout
///
/// When stock has moved since the cart was filled, the session cart is
/// clamped to what is left before the error is returned.
///
/// # Errors
///
/// `BadRequest` without a verified, serviceable address, or any
/// `CheckoutError` from starting the checkout.
#[instrument(skip(state, session))]
pub async fn begin(State(state): State<AppState>, session: Session) -> Result<Json<CheckoutStarted>> {
    let verified = session
        .get::<VerifiedCustomer>(keys::CUSTOMER)
        .await?
        .ok_or_else(|| AppError::BadRequest("Verify your delivery address first".to_string()))?;
    if !verified.serviceable {
        return Err(AppError::BadRequest(
            "Sorry, we don't deliver to that address".to_string(),
        ));
    }

    // A new checkout replaces one left hanging in this session.
    if let Some(previous) = session.get::<PendingOrder>(keys::PENDING_ORDER).await? {
        match state.checkout().abandon(previous.order_id).await {
            Ok(()) | Err(CheckoutError::OrderNotPending { .. } | CheckoutError::OrderNotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
        session.remove_value(keys::PENDING_ORDER).await?;
    }

    let mut cart = load_cart(&session).await?;
    let pending = match state
        .checkout()
        .begin(&cart, &verified.customer, state.now())
        .await
    {
        Ok(pending) => pending,
        Err(CheckoutError::InventoryChanged(shortfalls)) => {
            cart.apply_shortfalls(&shortfalls);
            save_cart(&session, &cart).await?;
            state.catalog().invalidate().await;
            return Err(CheckoutError::InventoryChanged(shortfalls).into());
        }
        Err(e) => return Err(e.into()),
    };

    session
        .insert(
            keys::PENDING_ORDER,
            PendingOrder {
                order_id: pending.order_id,
                payment_intent_id: pending.payment_intent_id.clone(),
            },
        )
        .await?;
    state.catalog().invalidate().await;

    add_breadcrumb(
        "checkout",
        "Checkout started",
        Some(&[("order_id", &pending.order_id.to_string())]),
    );

    Ok(Json(CheckoutStarted {
        order_id: pending.order_id,
        payment_intent_id: pending.payment_intent_id,
        client_secret: pending.client_secret,
        amount_minor: pending.amount_minor,
        totals: pending.totals,
    }))
}

/// Settle the session's pending order after the browser confirmed payment.
///
/// POST /api/checkout/confirm
///
/// # Errors
///
/// `BadRequest` with no checkout in progress, or any `CheckoutError` from
/// settling it.
#[instrument(skip(state, session))]
pub async fn confirm(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<OrderConfirmation>> {
    let pending = pending_order(&session).await?;

    let result = state
        .checkout()
        .complete(pending.order_id, &pending.payment_intent_id, state.now())
        .await;

    match result {
        Ok(confirmation) => {
            session.remove_value(keys::PENDING_ORDER).await?;
            save_cart(&session, &Cart::new()).await?;
            add_breadcrumb(
                "checkout",
                "Order confirmed",
                Some(&[("order_id", &pending.order_id.to_string())]),
            );
            Ok(Json(confirmation))
        }
        Err(e) => {
            // Settled orders can't be retried from this session.
            if matches!(e, CheckoutError::OrderNotPending { .. } | CheckoutError::OrderNotFound(_)) {
                session.remove_value(keys::PENDING_ORDER).await?;
            }
            if matches!(e, CheckoutError::PaymentDeclined(_)) {
                state.catalog().invalidate().await;
            }
            Err(e.into())
        }
    }
}

/// Cancel the session's pending order and return its stock.
///
/// POST /api/checkout/abandon
///
/// # Errors
///
/// `BadRequest` with no checkout in progress, or `OrderNotPending` if the
/// order was already settled.
#[instrument(skip(state, session))]
pub async fn abandon(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<OrderAbandoned>> {
    let pending = pending_order(&session).await?;

    let result = state.checkout().abandon(pending.order_id).await;
    session.remove_value(keys::PENDING_ORDER).await?;
    result?;

    state.catalog().invalidate().await;
    add_breadcrumb(
        "checkout",
        "Checkout abandoned",
        Some(&[("order_id", &pending.order_id.to_string())]),
    );

    Ok(Json(OrderAbandoned {
        order_id: pending.order_id,
    }))
}
