// src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use uuid::Uuid;

use crate::models::PaymentMethod;

/// Closed order status enum. Persisted and wire-visible as the
/// UPPER_SNAKE strings (`PENDING`, `PENDING_PAYMENT`, ...). Every
/// transition site matches on this type exhaustively; there are no loose
/// status strings anywhere in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "order_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  PendingPayment,
  WaitingTransferProof,
  Reserved,
  Processed,
  Delivered,
  Cancelled,
}

impl OrderStatus {
  /// Deferred-payment holding states. Orders in these states carry an
  /// `expires_at` and are tracked by the expiration sweep.
  pub fn is_held(self) -> bool {
    matches!(
      self,
      OrderStatus::PendingPayment | OrderStatus::WaitingTransferProof | OrderStatus::Reserved
    )
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
  }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Order {
  pub id: Uuid,
  pub status: OrderStatus,
  pub total_cents: i64,
  pub payment_method: PaymentMethod,

  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: Option<String>,

  // Only meaningful while the order sits in a holding state.
  pub expires_at: Option<DateTime<Utc>>,
  pub payment_reminder_sent: bool,

  // External payment correlation, stamped by the webhook processor.
  pub mp_payment_id: Option<String>,
  pub mp_status: Option<String>,

  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Order {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.status.is_held() && self.expires_at.map(|at| at < now).unwrap_or(false)
  }
}
