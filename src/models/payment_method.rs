// src/models/payment_method.rs

use chrono::Duration;
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;

use crate::config::AppConfig;
use crate::models::OrderStatus;

/// Supported payment methods. Each deferred method maps to a holding status
/// and a configured expiration window; the sweep and reminder jobs key off
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[sqlx(type_name = "payment_method", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
  Mercadopago,
  BankTransfer,
  CashOnPickup,
}

impl PaymentMethod {
  /// Status an order enters right after checkout with this method.
  pub fn holding_status(self) -> OrderStatus {
    match self {
      PaymentMethod::Mercadopago => OrderStatus::PendingPayment,
      PaymentMethod::BankTransfer => OrderStatus::WaitingTransferProof,
      PaymentMethod::CashOnPickup => OrderStatus::Reserved,
    }
  }

  /// How long an unpaid order is held before the sweep cancels it.
  pub fn expiration(self, config: &AppConfig) -> Duration {
    match self {
      PaymentMethod::Mercadopago => Duration::minutes(config.mp_expiration_minutes),
      PaymentMethod::BankTransfer => Duration::hours(config.transfer_expiration_hours),
      PaymentMethod::CashOnPickup => Duration::hours(config.pickup_expiration_hours),
    }
  }

  pub const ALL: [PaymentMethod; 3] = [
    PaymentMethod::Mercadopago,
    PaymentMethod::BankTransfer,
    PaymentMethod::CashOnPickup,
  ];
}
