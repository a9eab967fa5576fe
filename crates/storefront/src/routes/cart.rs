//! Cart route handlers.
//!
//! The cart lives in the session. Quantities are clamped to the stock shown
//! in the catalog; checkout re-verifies against the database.

use axum::{Json, extract::State};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use nightowl_core::{Cart, CartLine, OrderTotals, Product, ProductId};

use crate::error::{AppError, Result, add_breadcrumb};
use crate::models::keys;
use crate::state::AppState;

// =============================================================================
// Session Helpers
// =============================================================================

/// Get the cart from the session, or an empty one.
pub(crate) async fn load_cart(session: &Session) -> Result<Cart> {
    Ok(session.get::<Cart>(keys::CART).await?.unwrap_or_default())
}

/// Store the cart in the session.
pub(crate) async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(keys::CART, cart).await?;
    Ok(())
}

/// Find a product customers can order.
async fn orderable_product(state: &AppState, id: ProductId) -> Result<Product> {
    let products = state.catalog().products().await?;
    products
        .iter()
        .find(|p| p.id == id && p.visible)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Add up to `requested` units of `product`, one at a time, stopping at
/// the stock available. Returns how many were added.
fn add_units(cart: &mut Cart, product: &Product, requested: u32) -> u32 {
    let available = product.available();
    let mut added = 0;
    if cart.line(product.id).is_none() && requested > 0 && available > 0 {
        cart.add_line(product.id, product.price, &product.name);
        added = 1;
    }
    while added < requested && cart.increment_line(product.id, available) {
        added += 1;
    }
    added
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    pub quantity: u32,
    pub line_total: Decimal,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            name: line.name.clone(),
            unit_price: line.unit_price,
            quantity: line.quantity,
            line_total: line.line_total(),
        }
    }
}

/// Cart display data.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub totals: OrderTotals,
    pub min_order_value: Decimal,
    /// Whether the subtotal reaches the minimum without a top-up.
    pub meets_minimum: bool,
}

impl CartView {
    fn new(cart: &Cart, state: &AppState) -> Self {
        let settings = state.settings();
        let totals = cart.totals(settings.min_order_value, settings.delivery_charge);
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            meets_minimum: totals.top_up.is_zero(),
            totals,
            min_order_value: settings.min_order_value,
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Add to cart request body.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Option<u32>,
}

/// Update cart request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Remove from cart request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

/// Show the cart.
///
/// GET /api/cart
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be read.
pub async fn show(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = load_cart(&session).await?;
    Ok(Json(CartView::new(&cart, &state)))
}

/// Add units of a product, up to what is in stock.
///
/// POST /api/cart/add
///
/// # Errors
///
/// `NotFound` for unknown or hidden products, `BadRequest` when nothing can
/// be added because the product is out of stock.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let product = orderable_product(&state, request.product_id).await?;
    let mut cart = load_cart(&session).await?;

    if add_units(&mut cart, &product, request.quantity.unwrap_or(1)) == 0 {
        return Err(AppError::BadRequest(format!(
            "No more {} in stock",
            product.name
        )));
    }

    save_cart(&session, &cart).await?;

    add_breadcrumb(
        "cart",
        "Added to cart",
        Some(&[("product_id", &product.id.to_string())]),
    );

    Ok(Json(CartView::new(&cart, &state)))
}

/// Set a line's quantity, clamped to stock. Zero removes the line.
///
/// POST /api/cart/update
///
/// # Errors
///
/// `NotFound` if the product is not in the cart, or a database error when
/// stock cannot be read. The cart is left untouched on error.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    if cart.line(request.product_id).is_none() {
        return Err(AppError::NotFound(format!(
            "product {} in cart",
            request.product_id
        )));
    }

    let quantity = if request.quantity == 0 {
        0
    } else {
        // Products that were hidden or deleted have nothing left to order.
        let available = match orderable_product(&state, request.product_id).await {
            Ok(product) => product.available(),
            Err(AppError::NotFound(_)) => 0,
            Err(e) => return Err(e),
        };
        request.quantity.min(available)
    };
    cart.set_quantity(request.product_id, quantity);
    save_cart(&session, &cart).await?;

    Ok(Json(CartView::new(&cart, &state)))
}

/// Remove a line.
///
/// POST /api/cart/remove
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be written.
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&session).await?;
    cart.remove_line(request.product_id);
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(&cart, &state)))
}

/// Empty the cart.
///
/// POST /api/cart/clear
///
/// # Errors
///
/// Returns `AppError::Session` if the session cannot be written.
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Json<CartView>> {
    let cart = Cart::new();
    save_cart(&session, &cart).await?;
    Ok(Json(CartView::new(&cart, &state)))
}
