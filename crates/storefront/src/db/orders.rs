//! Order persistence and inventory reservation.
//!
//! Committing an order decrements inventory inside the same transaction that
//! writes the order, guarded by `inventory >= quantity`. Postgres row locks
//! serialize concurrent decrements of the same product, so two checkouts for
//! the last unit cannot both succeed.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use nightowl_core::{
    CustomerInfo, InventoryShortfall, OrderId, OrderLine, OrderSnapshot, OrderStatus, OrderTotals,
    PhoneNumber, ProductId,
};

use super::{ProductRepository, RepositoryError, quantity_from_db, quantity_to_db};
use crate::services::{OrderStore, PlacedOrder};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    status: OrderStatus,
    customer_name: String,
    customer_phone: String,
    customer_address: String,
    instructions: Option<String>,
    subtotal: Decimal,
    top_up: Decimal,
    delivery_charge: Decimal,
    total: Decimal,
    payment_intent_id: String,
    placed_at: NaiveDateTime,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

/// `PostgreSQL`-backed [`OrderStore`].
#[derive(Debug, Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pending orders placed before `cutoff`, oldest first.
    ///
    /// Used by operators to reconcile orders whose payment outcome was never
    /// reported back.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn pending_before(
        &self,
        cutoff: NaiveDateTime,
    ) -> Result<Vec<(OrderId, String)>, RepositoryError> {
        let rows: Vec<(OrderId, String)> = sqlx::query_as(
            r"
            SELECT id, payment_intent_id FROM orders
            WHERE status = 'pending' AND placed_at < $1
            ORDER BY placed_at
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

impl OrderStore for PgOrderStore {
    async fn available_quantities(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, u32>, RepositoryError> {
        ProductRepository::new(&self.pool)
            .available_quantities(ids)
            .await
    }

    #[instrument(skip(self, order), fields(lines = order.lines.len()))]
    async fn commit_order(&self, order: &OrderSnapshot) -> Result<OrderId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let inserted: Result<(OrderId,), sqlx::Error> = sqlx::query_as(
            r"
            INSERT INTO orders
                (status, customer_name, customer_phone, customer_address, instructions,
                 subtotal, top_up, delivery_charge, total, payment_intent_id, placed_at)
            VALUES ('pending', $1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            ",
        )
        .bind(&order.customer.name)
        .bind(order.customer.phone.as_str())
        .bind(&order.customer.address)
        .bind(&order.customer.instructions)
        .bind(order.totals.subtotal)
        .bind(order.totals.top_up)
        .bind(order.totals.delivery_charge)
        .bind(order.totals.total)
        .bind(&order.payment_intent_id)
        .bind(order.placed_at)
        .fetch_one(&mut *tx)
        .await;

        let order_id = match inserted {
            Ok((id,)) => id,
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                return Err(RepositoryError::Conflict(format!(
                    "payment intent {} already has an order",
                    order.payment_intent_id
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut shortfalls = Vec::new();
        for line in &order.lines {
            let quantity = quantity_to_db(line.quantity)?;
            let updated = sqlx::query(
                r"
                UPDATE products
                SET inventory = inventory - $1, updated_at = now()
                WHERE id = $2 AND inventory >= $1
                ",
            )
            .bind(quantity)
            .bind(line.product_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                let current: Option<(i32,)> =
                    sqlx::query_as("SELECT inventory FROM products WHERE id = $1")
                        .bind(line.product_id)
                        .fetch_optional(&mut *tx)
                        .await?;
                shortfalls.push(InventoryShortfall {
                    product_id: line.product_id,
                    name: line.name.clone(),
                    requested: line.quantity,
                    available: current.map_or(0, |(n,)| u32::try_from(n).unwrap_or(0)),
                });
            }
        }

        if !shortfalls.is_empty() {
            tx.rollback().await?;
            tracing::info!(count = shortfalls.len(), "Order lost an inventory race");
            return Err(RepositoryError::InsufficientStock(shortfalls));
        }

        for (position, line) in (1_i32..).zip(&order.lines) {
            sqlx::query(
                r"
                INSERT INTO order_items (order_id, position, product_id, name, unit_price, quantity)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order_id)
            .bind(position)
            .bind(line.product_id)
            .bind(&line.name)
            .bind(line.unit_price)
            .bind(quantity_to_db(line.quantity)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(order_id = %order_id, total = %order.totals.total, "Order committed");
        Ok(order_id)
    }

    #[instrument(skip(self))]
    async fn load_order(&self, id: OrderId) -> Result<Option<PlacedOrder>, RepositoryError> {
        let Some(row): Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, status, customer_name, customer_phone, customer_address, instructions,
                   subtotal, top_up, delivery_charge, total, payment_intent_id, placed_at
            FROM orders WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let items: Vec<OrderItemRow> = sqlx::query_as(
            r"
            SELECT product_id, name, unit_price, quantity
            FROM order_items WHERE order_id = $1
            ORDER BY position
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let phone = PhoneNumber::parse(&row.customer_phone).map_err(|e| {
            RepositoryError::DataCorruption(format!("order {}: {e}", row.id))
        })?;

        let lines = items
            .into_iter()
            .map(|item| {
                Ok(OrderLine {
                    product_id: item.product_id,
                    name: item.name,
                    unit_price: item.unit_price,
                    quantity: quantity_from_db(item.quantity, "order item quantity")?,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Some(PlacedOrder {
            id: row.id,
            status: row.status,
            snapshot: OrderSnapshot {
                customer: CustomerInfo {
                    name: row.customer_name,
                    phone,
                    address: row.customer_address,
                    instructions: row.instructions,
                },
                lines,
                totals: OrderTotals {
                    subtotal: row.subtotal,
                    top_up: row.top_up,
                    delivery_charge: row.delivery_charge,
                    total: row.total,
                },
                payment_intent_id: row.payment_intent_id,
                placed_at: row.placed_at,
            },
        }))
    }

    #[instrument(skip(self))]
    async fn mark_confirmed(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders SET status = 'confirmed', confirmed_at = now()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self))]
    async fn abandon_order(&self, id: OrderId) -> Result<bool, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"
            UPDATE orders SET status = 'abandoned', abandoned_at = now()
            WHERE id = $1 AND status = 'pending'
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            r"
            UPDATE products p
            SET inventory = p.inventory + oi.quantity, updated_at = now()
            FROM order_items oi
            WHERE oi.order_id = $1 AND p.id = oi.product_id
            ",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(order_id = %id, "Order abandoned and restocked");
        Ok(true)
    }
}
