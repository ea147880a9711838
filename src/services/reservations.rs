// src/services/reservations.rs

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::{ProductStore, ReservationStore};
use crate::errors::{AppError, Result};
use crate::models::StockReservation;

/// Time-boxed stock holds for checkout sessions.
///
/// A reservation never decrements authoritative stock; it only shrinks the
/// *available* figure computed on read (`stock - sum of active holds`). The
/// permanent decrement happens at confirm time, re-validated against the live
/// stock value. That deferral means an abandoned session can never lock
/// stock permanently; the cost is that availability is a soft advisory
/// figure between create and confirm.
pub struct ReservationManager {
  products: Arc<dyn ProductStore>,
  reservations: Arc<dyn ReservationStore>,
  ttl: Duration,
}

impl ReservationManager {
  pub fn new(products: Arc<dyn ProductStore>, reservations: Arc<dyn ReservationStore>, ttl: Duration) -> Self {
    Self {
      products,
      reservations,
      ttl,
    }
  }

  /// `max(0, stock - sum of active holds)`. Expired-but-uncollected holds
  /// are excluded here, not just by the GC pass.
  pub async fn get_available_stock(&self, product_id: Uuid) -> Result<i32> {
    let product = self
      .products
      .get(product_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
    let reserved = self.reservations.sum_active_for_product(product_id, Utc::now()).await?;
    let available = i64::from(product.stock) - reserved;
    Ok(available.max(0) as i32)
  }

  /// Check-then-insert hold creation. The availability check here is
  /// optimistic and not atomic against concurrent callers; correctness is
  /// recovered at confirm time, which always re-validates against live
  /// stock.
  #[instrument(name = "reservations::create", skip(self))]
  pub async fn create_reservation(&self, product_id: Uuid, quantity: i32, session_id: &str) -> Result<StockReservation> {
    if quantity <= 0 {
      return Err(AppError::Validation("Reservation quantity must be positive".to_string()));
    }

    let available = self.get_available_stock(product_id).await?;
    if available < quantity {
      warn!(%product_id, quantity, available, "Reservation rejected: insufficient stock");
      return Err(AppError::InsufficientStock { available });
    }

    let reservation = StockReservation {
      id: Uuid::new_v4(),
      product_id,
      quantity,
      session_id: session_id.to_string(),
      expires_at: Utc::now() + self.ttl,
    };
    self.reservations.insert(reservation.clone()).await?;
    info!(reservation_id = %reservation.id, %product_id, quantity, "Reservation created");
    Ok(reservation)
  }

  /// Deletes all of the session's holds. Idempotent; releasing a session
  /// with no holds is a no-op. Stock is never touched, because holds never
  /// subtracted from it.
  #[instrument(name = "reservations::release", skip(self))]
  pub async fn release_reservation(&self, session_id: &str) -> Result<u64> {
    let released = self.reservations.delete_for_session(session_id).await?;
    info!(session_id, released, "Reservations released");
    Ok(released)
  }

  /// Pushes `expires_at` forward another TTL for every hold in the session,
  /// keeping them alive while the user is active in checkout.
  #[instrument(name = "reservations::extend", skip(self))]
  pub async fn extend_reservation(&self, session_id: &str) -> Result<u64> {
    let new_expiry = Utc::now() + self.ttl;
    let extended = self.reservations.extend_for_session(session_id, new_expiry).await?;
    info!(session_id, extended, "Reservations extended");
    Ok(extended)
  }

  /// Converts the session's holds into permanent stock decrements.
  ///
  /// Every decrement is conditional on the live stock covering it, so stock
  /// cannot go negative even when two sessions race over the same product.
  /// Any shortfall aborts the whole confirmation: decrements already applied
  /// are rolled back, the holds stay in place, and the caller surfaces an
  /// out-of-stock error instead of partially fulfilling. Returns the holds
  /// that were converted, so checkout can freeze them into line items.
  #[instrument(name = "reservations::confirm", skip(self))]
  pub async fn confirm_reservation(&self, session_id: &str) -> Result<Vec<StockReservation>> {
    let holds = self.reservations.list_for_session(session_id).await?;
    if holds.is_empty() {
      return Err(AppError::NotFound(format!("No reservations for session {}", session_id)));
    }

    let mut applied: Vec<&StockReservation> = Vec::with_capacity(holds.len());
    for hold in &holds {
      let decremented = self.products.try_decrement_stock(hold.product_id, hold.quantity).await?;
      if !decremented {
        // Undo the decrements that already went through before reporting.
        for done in &applied {
          self.products.increment_stock(done.product_id, done.quantity).await?;
        }
        let available = self.get_available_stock(hold.product_id).await?;
        warn!(session_id, product_id = %hold.product_id, available, "Confirm rejected: live stock insufficient");
        return Err(AppError::InsufficientStock { available });
      }
      applied.push(hold);
    }

    for hold in &holds {
      self.reservations.delete_one(hold.id).await?;
    }
    info!(session_id, holds = holds.len(), "Reservations confirmed");
    Ok(holds)
  }

  /// Deletes holds whose TTL has passed. Pure garbage collection: expired
  /// holds never decremented stock, so there is nothing to restore.
  #[instrument(name = "reservations::clean_expired", skip(self))]
  pub async fn clean_expired_reservations(&self) -> Result<u64> {
    let removed = self.reservations.delete_expired(Utc::now()).await?;
    if removed > 0 {
      info!(removed, "Expired reservations collected");
    }
    Ok(removed)
  }
}
