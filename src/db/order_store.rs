// src/db/order_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod};

const ORDER_COLUMNS: &str = "id, status, total_cents, payment_method, customer_name, customer_email, \
   customer_phone, expires_at, payment_reminder_sent, mp_payment_id, mp_status, created_at, updated_at";

/// Port over orders and their line items. Orders are never deleted; a
/// cancelled order is retained for audit.
#[async_trait]
pub trait OrderStore: Send + Sync {
  /// Inserts the order and all of its items atomically.
  async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> Result<()>;

  async fn get(&self, id: Uuid) -> Result<Option<Order>>;

  async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>>;

  async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<()>;

  /// Sets the status and stamps the external payment correlation fields in
  /// one update, so a webhook replay rewrites the same values.
  async fn record_payment_result(
    &self,
    id: Uuid,
    status: OrderStatus,
    mp_payment_id: &str,
    mp_status: &str,
  ) -> Result<()>;

  /// Held orders whose `expires_at` has passed, oldest first, bounded.
  async fn find_expired_held(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Order>>;

  /// Orders created inside the half-life reminder window for `method` that
  /// still sit in the method's holding status and have not been reminded.
  async fn find_reminder_candidates(
    &self,
    method: PaymentMethod,
    holding_status: OrderStatus,
    created_after: DateTime<Utc>,
    created_before: DateTime<Utc>,
    limit: i64,
  ) -> Result<Vec<Order>>;

  async fn mark_reminder_sent(&self, id: Uuid) -> Result<()>;

  /// Marks the order `CANCELLED` and restores every line item's product
  /// stock inside a single transaction, so no reader ever observes a
  /// cancelled order with un-restored stock or the reverse. Returns the
  /// number of stock units restored, or `None` without mutating when the
  /// order is no longer in a held state (e.g. an overlapping sweep already
  /// cancelled it).
  async fn cancel_and_restore(&self, order: &Order) -> Result<Option<i32>>;
}

pub struct PgOrderStore {
  pool: PgPool,
}

impl PgOrderStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl OrderStore for PgOrderStore {
  async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
    let mut tx = self.pool.begin().await?;

    sqlx::query(
      "INSERT INTO orders (id, status, total_cents, payment_method, customer_name, customer_email, \
       customer_phone, expires_at, payment_reminder_sent, mp_payment_id, mp_status, created_at, updated_at) \
       VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
    )
    .bind(order.id)
    .bind(order.status)
    .bind(order.total_cents)
    .bind(order.payment_method)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(order.expires_at)
    .bind(order.payment_reminder_sent)
    .bind(&order.mp_payment_id)
    .bind(&order.mp_status)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *tx)
    .await?;

    for item in items {
      sqlx::query(
        "INSERT INTO order_items (id, order_id, product_id, quantity, price_cents) VALUES ($1, $2, $3, $4, $5)",
      )
      .bind(item.id)
      .bind(item.order_id)
      .bind(item.product_id)
      .bind(item.quantity)
      .bind(item.price_cents)
      .execute(&mut *tx)
      .await?;
    }

    tx.commit().await?;
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(&format!("SELECT {} FROM orders WHERE id = $1", ORDER_COLUMNS))
      .bind(id)
      .fetch_optional(&self.pool)
      .await?;
    Ok(order)
  }

  async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price_cents FROM order_items WHERE order_id = $1",
    )
    .bind(order_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(items)
  }

  async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
    let result = sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(status)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(crate::errors::AppError::NotFound(format!("Order {} not found", id)));
    }
    Ok(())
  }

  async fn record_payment_result(
    &self,
    id: Uuid,
    status: OrderStatus,
    mp_payment_id: &str,
    mp_status: &str,
  ) -> Result<()> {
    let result = sqlx::query(
      "UPDATE orders SET status = $2, mp_payment_id = $3, mp_status = $4, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(status)
    .bind(mp_payment_id)
    .bind(mp_status)
    .execute(&self.pool)
    .await?;
    if result.rows_affected() == 0 {
      return Err(crate::errors::AppError::NotFound(format!("Order {} not found", id)));
    }
    Ok(())
  }

  async fn find_expired_held(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders \
       WHERE status IN ('PENDING_PAYMENT', 'WAITING_TRANSFER_PROOF', 'RESERVED') \
       AND expires_at IS NOT NULL AND expires_at < $1 \
       ORDER BY expires_at ASC LIMIT $2",
      ORDER_COLUMNS
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  async fn find_reminder_candidates(
    &self,
    method: PaymentMethod,
    holding_status: OrderStatus,
    created_after: DateTime<Utc>,
    created_before: DateTime<Utc>,
    limit: i64,
  ) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(&format!(
      "SELECT {} FROM orders \
       WHERE payment_method = $1 AND status = $2 AND payment_reminder_sent = FALSE \
       AND created_at > $3 AND created_at <= $4 \
       ORDER BY created_at ASC LIMIT $5",
      ORDER_COLUMNS
    ))
    .bind(method)
    .bind(holding_status)
    .bind(created_after)
    .bind(created_before)
    .bind(limit)
    .fetch_all(&self.pool)
    .await?;
    Ok(orders)
  }

  async fn mark_reminder_sent(&self, id: Uuid) -> Result<()> {
    sqlx::query("UPDATE orders SET payment_reminder_sent = TRUE, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn cancel_and_restore(&self, order: &Order) -> Result<Option<i32>> {
    let mut tx = self.pool.begin().await?;

    // Conditional on the order still being held: two overlapping sweep runs
    // must not restore the same stock twice.
    let cancelled = sqlx::query(
      "UPDATE orders SET status = 'CANCELLED', updated_at = NOW() \
       WHERE id = $1 AND status IN ('PENDING_PAYMENT', 'WAITING_TRANSFER_PROOF', 'RESERVED')",
    )
    .bind(order.id)
    .execute(&mut *tx)
    .await?;

    if cancelled.rows_affected() == 0 {
      tx.rollback().await?;
      return Ok(None);
    }

    let items = sqlx::query_as::<_, OrderItem>(
      "SELECT id, order_id, product_id, quantity, price_cents FROM order_items WHERE order_id = $1",
    )
    .bind(order.id)
    .fetch_all(&mut *tx)
    .await?;

    let mut restored = 0;
    for item in &items {
      sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&mut *tx)
        .await?;
      restored += item.quantity;
    }

    tx.commit().await?;
    Ok(Some(restored))
  }
}
