// src/db/reservation_store.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::StockReservation;

/// Port over the reservation rows. Reservations are scoped per checkout
/// session; "active" always means `expires_at > now`, never merely "not yet
/// garbage-collected".
#[async_trait]
pub trait ReservationStore: Send + Sync {
  async fn insert(&self, reservation: StockReservation) -> Result<()>;

  /// Sum of quantities across the product's active (non-expired) holds.
  async fn sum_active_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<i64>;

  async fn list_for_session(&self, session_id: &str) -> Result<Vec<StockReservation>>;

  /// Deletes the session's holds; returns how many rows went away. Deleting
  /// an already-released session is a no-op.
  async fn delete_for_session(&self, session_id: &str) -> Result<u64>;

  async fn delete_one(&self, id: Uuid) -> Result<()>;

  async fn extend_for_session(&self, session_id: &str, new_expiry: DateTime<Utc>) -> Result<u64>;

  /// Garbage collection of expired rows. Never touches product stock.
  async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct PgReservationStore {
  pool: PgPool,
}

impl PgReservationStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ReservationStore for PgReservationStore {
  async fn insert(&self, reservation: StockReservation) -> Result<()> {
    sqlx::query(
      "INSERT INTO stock_reservations (id, product_id, quantity, session_id, expires_at) VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(reservation.id)
    .bind(reservation.product_id)
    .bind(reservation.quantity)
    .bind(&reservation.session_id)
    .bind(reservation.expires_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  async fn sum_active_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
    let sum: i64 = sqlx::query_scalar(
      "SELECT COALESCE(SUM(quantity), 0) FROM stock_reservations WHERE product_id = $1 AND expires_at > $2",
    )
    .bind(product_id)
    .bind(now)
    .fetch_one(&self.pool)
    .await?;
    Ok(sum)
  }

  async fn list_for_session(&self, session_id: &str) -> Result<Vec<StockReservation>> {
    let rows = sqlx::query_as::<_, StockReservation>(
      "SELECT id, product_id, quantity, session_id, expires_at FROM stock_reservations WHERE session_id = $1",
    )
    .bind(session_id)
    .fetch_all(&self.pool)
    .await?;
    Ok(rows)
  }

  async fn delete_for_session(&self, session_id: &str) -> Result<u64> {
    let result = sqlx::query("DELETE FROM stock_reservations WHERE session_id = $1")
      .bind(session_id)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn delete_one(&self, id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM stock_reservations WHERE id = $1")
      .bind(id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  async fn extend_for_session(&self, session_id: &str, new_expiry: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("UPDATE stock_reservations SET expires_at = $2 WHERE session_id = $1")
      .bind(session_id)
      .bind(new_expiry)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }

  async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
    let result = sqlx::query("DELETE FROM stock_reservations WHERE expires_at <= $1")
      .bind(now)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected())
  }
}
