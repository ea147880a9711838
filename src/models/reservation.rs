// src/models/reservation.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A time-boxed, session-scoped stock hold. Reservations shrink the
/// *available* figure computed on read; they never decrement authoritative
/// stock. The permanent decrement happens only at confirm time.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockReservation {
  pub id: Uuid,
  pub product_id: Uuid,
  pub quantity: i32,
  pub session_id: String,
  pub expires_at: DateTime<Utc>,
}

impl StockReservation {
  /// A hold counts against availability only while its TTL is in the future.
  /// Expired-but-uncollected rows are excluded by every read.
  pub fn is_active(&self, now: DateTime<Utc>) -> bool {
    self.expires_at > now
  }
}
