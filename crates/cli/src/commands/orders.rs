//! Order maintenance commands.

use chrono::{Local, TimeDelta};

use nightowl_storefront::db::{self, PgOrderStore};

use super::database_url;

/// List orders that have waited on payment for longer than `older_than`
/// minutes.
///
/// An order stays pending if the server stopped between committing it and
/// settling its payment. The payment-intent id identifies the charge in the
/// Stripe dashboard for manual reconciliation.
///
/// # Errors
///
/// Returns an error if the database cannot be queried.
pub async fn pending(older_than: u32) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::create_pool(&database_url()?).await?;

    let cutoff = Local::now().naive_local() - TimeDelta::minutes(i64::from(older_than));
    let orders = PgOrderStore::new(pool).pending_before(cutoff).await?;

    if orders.is_empty() {
        tracing::info!("No orders pending for more than {older_than} minutes");
        return Ok(());
    }

    tracing::info!("{} order(s) pending for more than {older_than} minutes:", orders.len());
    for (id, payment_intent_id) in &orders {
        tracing::info!("  #{id}  {payment_intent_id}");
    }
    Ok(())
}
