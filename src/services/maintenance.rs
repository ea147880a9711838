// src/services/maintenance.rs

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::db::OrderStore;
use crate::errors::Result;
use crate::models::PaymentMethod;
use crate::services::email::Mailer;
use crate::services::reservations::ReservationManager;
use crate::services::status::OrderStateMachine;

/// Orders swept per run. Keeps a single trigger invocation short-lived.
const SWEEP_BATCH: i64 = 50;
/// Reminder emails per run, shared across payment methods.
const REMINDER_BATCH: i64 = 20;

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceSummary {
  pub cancelled: u32,
  pub restored_stock: i64,
  pub reminders_sent: u32,
  pub errors: Vec<String>,
}

/// The periodic sweep pair: cancel-and-restore for expired held orders, and
/// half-life payment reminders. Both are read-filter → mutate → notify, with
/// each order isolated so one failure never aborts its siblings. The
/// external scheduler may overlap two invocations; the conditional
/// cancel-and-restore keeps that harmless.
pub struct MaintenanceService {
  orders: Arc<dyn OrderStore>,
  state_machine: Arc<OrderStateMachine>,
  reservations: Arc<ReservationManager>,
  mailer: Arc<dyn Mailer>,
  config: Arc<AppConfig>,
}

impl MaintenanceService {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    state_machine: Arc<OrderStateMachine>,
    reservations: Arc<ReservationManager>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
  ) -> Self {
    Self {
      orders,
      state_machine,
      reservations,
      mailer,
      config,
    }
  }

  #[instrument(name = "maintenance::run", skip(self))]
  pub async fn run(&self) -> Result<MaintenanceSummary> {
    let mut summary = MaintenanceSummary::default();
    self.sweep_expired_orders(&mut summary).await;
    self.send_payment_reminders(&mut summary).await;

    // Reservation GC rides along with the sweep; it never touches stock.
    if let Err(e) = self.reservations.clean_expired_reservations().await {
      warn!(error = %e, "Expired-reservation cleanup failed");
      summary.errors.push(format!("reservation cleanup: {}", e));
    }

    info!(
      cancelled = summary.cancelled,
      restored_stock = summary.restored_stock,
      reminders_sent = summary.reminders_sent,
      errors = summary.errors.len(),
      "Maintenance run finished"
    );
    Ok(summary)
  }

  /// Cancels held orders whose `expires_at` has passed, restoring their
  /// stock atomically per order. Per-order failures are recorded and the
  /// batch moves on.
  async fn sweep_expired_orders(&self, summary: &mut MaintenanceSummary) {
    let expired = match self.orders.find_expired_held(Utc::now(), SWEEP_BATCH).await {
      Ok(orders) => orders,
      Err(e) => {
        warn!(error = %e, "Expired-order query failed; skipping sweep");
        summary.errors.push(format!("sweep query: {}", e));
        return;
      }
    };

    for order in &expired {
      match self.state_machine.cancel_and_notify(order).await {
        Ok(Some(restored)) => {
          summary.cancelled += 1;
          summary.restored_stock += i64::from(restored);
        }
        Ok(None) => {} // a concurrent run got there first
        Err(e) => {
          warn!(order_id = %order.id, error = %e, "Failed to cancel expired order");
          summary.errors.push(format!("order {}: {}", order.id, e));
        }
      }
    }
  }

  /// Sends the one-time reminder to orders sitting past the half-life point
  /// of their payment method's expiration window. The flag only flips after
  /// a successful send, so a failed delivery is retried on the next run.
  async fn send_payment_reminders(&self, summary: &mut MaintenanceSummary) {
    let now = Utc::now();
    let mut budget = REMINDER_BATCH;

    for method in PaymentMethod::ALL {
      if budget <= 0 {
        break;
      }
      let expiration = method.expiration(&self.config);
      // Created more than half the window ago, but not so long ago that the
      // sweep already owns it.
      let created_after = now - expiration;
      let created_before = now - expiration / 2;

      let candidates = match self
        .orders
        .find_reminder_candidates(method, method.holding_status(), created_after, created_before, budget)
        .await
      {
        Ok(orders) => orders,
        Err(e) => {
          warn!(?method, error = %e, "Reminder candidate query failed");
          summary.errors.push(format!("reminder query {:?}: {}", method, e));
          continue;
        }
      };

      for order in &candidates {
        budget -= 1;
        let subject = format!("Payment reminder for order {}", order.id);
        let body = format!(
          "<p>Hi {},</p><p>Order <b>{}</b> is still waiting for payment. It will be \
           cancelled automatically at {} if the payment is not completed.</p>",
          order.customer_name,
          order.id,
          order.expires_at.map(|at| at.to_rfc3339()).unwrap_or_default()
        );
        match self
          .mailer
          .send(&order.customer_email, &self.config.email_sender, &subject, &body)
          .await
        {
          Ok(_) => {
            if let Err(e) = self.orders.mark_reminder_sent(order.id).await {
              warn!(order_id = %order.id, error = %e, "Reminder sent but flag update failed");
              summary.errors.push(format!("reminder flag {}: {}", order.id, e));
            } else {
              summary.reminders_sent += 1;
            }
          }
          Err(e) => {
            warn!(order_id = %order.id, error = %e, "Reminder email failed");
            summary.errors.push(format!("reminder {}: {}", order.id, e));
          }
        }
      }
    }
  }
}
