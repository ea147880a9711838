// src/services/status.rs

use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::OrderStore;
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus};
use crate::services::email::Mailer;

/// The legal transition table. Anything not listed here is rejected; there
/// is deliberately no way to leave `DELIVERED` or `CANCELLED`.
pub fn is_legal_transition(from: OrderStatus, to: OrderStatus) -> bool {
  use OrderStatus::*;
  match (from, to) {
    // Admin-driven happy path.
    (Pending, PendingPayment) | (PendingPayment, Processed) | (Processed, Delivered) => true,
    // Payment-driven promotion out of the remaining held states.
    (WaitingTransferProof, Processed) | (Reserved, Processed) => true,
    // Manual escape: back to the front of the manual queue.
    (PendingPayment | WaitingTransferProof | Reserved | Processed, Pending) => true,
    // Expiry-driven cancellation of held orders.
    (PendingPayment | WaitingTransferProof | Reserved, Cancelled) => true,
    _ => false,
  }
}

/// Applies transitions and their side effects. Every entry into `CANCELLED`
/// from a held state goes through the store's single-transaction
/// cancel-and-restore, whether it originated from the sweep or from an admin
/// status change.
pub struct OrderStateMachine {
  orders: Arc<dyn OrderStore>,
  mailer: Arc<dyn Mailer>,
  email_sender: String,
}

impl OrderStateMachine {
  pub fn new(orders: Arc<dyn OrderStore>, mailer: Arc<dyn Mailer>, email_sender: String) -> Self {
    Self {
      orders,
      mailer,
      email_sender,
    }
  }

  pub async fn get(&self, order_id: Uuid) -> Result<Order> {
    self
      .orders
      .get(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))
  }

  /// Moves the order to `to`, rejecting pairs outside the transition table.
  #[instrument(name = "status::transition", skip(self))]
  pub async fn transition(&self, order_id: Uuid, to: OrderStatus) -> Result<Order> {
    let order = self.get(order_id).await?;

    if !is_legal_transition(order.status, to) {
      return Err(AppError::IllegalTransition {
        from: order.status,
        to,
      });
    }

    if to == OrderStatus::Cancelled {
      self.cancel_and_notify(&order).await?;
    } else {
      self.orders.set_status(order_id, to).await?;
      info!(%order_id, from = ?order.status, ?to, "Order status changed");
    }

    self.get(order_id).await
  }

  /// Cancels a held order, restoring its line items' stock in one
  /// transaction, then attempts the cancellation email. The email is a
  /// best-effort side channel with its own error boundary: a delivery
  /// failure never rolls back the cancellation that already committed.
  /// Returns the number of stock units restored, or `None` when a concurrent
  /// run already cancelled the order.
  #[instrument(name = "status::cancel", skip(self, order), fields(order_id = %order.id))]
  pub async fn cancel_and_notify(&self, order: &Order) -> Result<Option<i32>> {
    let restored = match self.orders.cancel_and_restore(order).await? {
      Some(restored) => restored,
      None => {
        info!(order_id = %order.id, "Order was no longer held; nothing to cancel");
        return Ok(None);
      }
    };
    info!(order_id = %order.id, restored, "Order cancelled, stock restored");

    let subject = format!("Your order {} was cancelled", order.id);
    let body = format!(
      "<p>Hi {},</p><p>Order <b>{}</b> expired before payment was received and has been cancelled. \
       The reserved items were returned to stock.</p>",
      order.customer_name, order.id
    );
    if let Err(e) = self
      .mailer
      .send(&order.customer_email, &self.email_sender, &subject, &body)
      .await
    {
      warn!(order_id = %order.id, error = %e, "Cancellation email failed; cancellation stands");
    }

    Ok(Some(restored))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use OrderStatus::*;

  const ALL: [OrderStatus; 7] = [
    Pending,
    PendingPayment,
    WaitingTransferProof,
    Reserved,
    Processed,
    Delivered,
    Cancelled,
  ];

  #[test]
  fn happy_path_is_legal() {
    assert!(is_legal_transition(Pending, PendingPayment));
    assert!(is_legal_transition(PendingPayment, Processed));
    assert!(is_legal_transition(Processed, Delivered));
  }

  #[test]
  fn every_held_state_can_process_or_cancel() {
    for held in [PendingPayment, WaitingTransferProof, Reserved] {
      assert!(is_legal_transition(held, Processed));
      assert!(is_legal_transition(held, Cancelled));
      assert!(is_legal_transition(held, Pending));
    }
  }

  #[test]
  fn terminal_states_have_no_exits() {
    for to in ALL {
      assert!(!is_legal_transition(Delivered, to));
      assert!(!is_legal_transition(Cancelled, to));
    }
  }

  #[test]
  fn self_transitions_are_rejected() {
    for status in ALL {
      assert!(!is_legal_transition(status, status));
    }
  }

  #[test]
  fn pending_cannot_jump_ahead() {
    assert!(!is_legal_transition(Pending, Processed));
    assert!(!is_legal_transition(Pending, Delivered));
    assert!(!is_legal_transition(Pending, Cancelled));
    assert!(!is_legal_transition(Pending, Reserved));
  }
}
