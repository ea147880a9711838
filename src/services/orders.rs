// src/services/orders.rs

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::db::{OrderStore, ProductStore};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, PaymentMethod};
use crate::services::email::Mailer;
use crate::services::reservations::ReservationManager;

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderItem {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
  pub session_id: String,
  pub payment_method: PaymentMethod,
  pub customer_name: String,
  pub customer_email: String,
  pub customer_phone: Option<String>,
  /// Fallback line items for the checkout path that skipped reservation.
  /// Ignored whenever the session holds active reservations.
  #[serde(default)]
  pub items: Vec<PlaceOrderItem>,
}

/// Checkout submission: turns a session's holds (or, failing that, the
/// request's explicit items) into an Order with frozen line-item prices,
/// decrementing stock permanently on the way.
pub struct OrderService {
  orders: Arc<dyn OrderStore>,
  products: Arc<dyn ProductStore>,
  reservations: Arc<ReservationManager>,
  mailer: Arc<dyn Mailer>,
  config: Arc<AppConfig>,
}

impl OrderService {
  pub fn new(
    orders: Arc<dyn OrderStore>,
    products: Arc<dyn ProductStore>,
    reservations: Arc<ReservationManager>,
    mailer: Arc<dyn Mailer>,
    config: Arc<AppConfig>,
  ) -> Self {
    Self {
      orders,
      products,
      reservations,
      mailer,
      config,
    }
  }

  #[instrument(name = "orders::place", skip(self, request), fields(session_id = %request.session_id))]
  pub async fn place_order(&self, request: &PlaceOrderRequest) -> Result<Order> {
    if request.customer_email.trim().is_empty() {
      return Err(AppError::Validation("Customer email is required".to_string()));
    }

    let order_id = Uuid::new_v4();
    let now = Utc::now();

    // Prefer the session's holds; they already passed the availability
    // check. The explicit item list only backs the reservation-less path.
    let line_items = match self.reservations.confirm_reservation(&request.session_id).await {
      Ok(holds) => holds
        .into_iter()
        .map(|h| (h.product_id, h.quantity))
        .collect::<Vec<_>>(),
      Err(AppError::NotFound(_)) if !request.items.is_empty() => {
        self.decrement_direct(&request.items).await?
      }
      Err(e) => return Err(e),
    };

    let mut items = Vec::with_capacity(line_items.len());
    let mut total_cents: i64 = 0;
    for (product_id, quantity) in &line_items {
      let product = match self.products.get(*product_id).await? {
        Some(p) => p,
        None => {
          self.undo_decrements(&line_items).await;
          return Err(AppError::NotFound(format!("Product {} not found", product_id)));
        }
      };
      total_cents += i64::from(product.price_cents) * i64::from(*quantity);
      items.push(OrderItem {
        id: Uuid::new_v4(),
        order_id,
        product_id: *product_id,
        quantity: *quantity,
        price_cents: product.price_cents,
      });
    }

    let status = request.payment_method.holding_status();
    let expires_at = now + request.payment_method.expiration(&self.config);
    let order = Order {
      id: order_id,
      status,
      total_cents,
      payment_method: request.payment_method,
      customer_name: request.customer_name.clone(),
      customer_email: request.customer_email.clone(),
      customer_phone: request.customer_phone.clone(),
      expires_at: Some(expires_at),
      payment_reminder_sent: false,
      mp_payment_id: None,
      mp_status: None,
      created_at: now,
      updated_at: now,
    };

    if let Err(e) = self.orders.insert_with_items(&order, &items).await {
      // Stock was already decremented; hand it back before failing.
      self.undo_decrements(&line_items).await;
      return Err(e);
    }
    info!(%order_id, total_cents, ?status, "Order placed");

    let subject = format!("We received your order {}", order.id);
    let body = format!(
      "<p>Hi {},</p><p>Your order <b>{}</b> is registered and held until {}. \
       Complete the payment to confirm it.</p>",
      order.customer_name, order.id, expires_at
    );
    if let Err(e) = self
      .mailer
      .send(&order.customer_email, &self.config.email_sender, &subject, &body)
      .await
    {
      warn!(%order_id, error = %e, "Order confirmation email failed; order stands");
    }

    Ok(order)
  }

  /// Reservation-less checkout: conditionally decrement each item against
  /// live stock, undoing earlier decrements if any product falls short.
  async fn decrement_direct(&self, items: &[PlaceOrderItem]) -> Result<Vec<(Uuid, i32)>> {
    let mut applied: Vec<(Uuid, i32)> = Vec::with_capacity(items.len());
    for item in items {
      if item.quantity <= 0 {
        return Err(AppError::Validation("Item quantity must be positive".to_string()));
      }
      let ok = self.products.try_decrement_stock(item.product_id, item.quantity).await?;
      if !ok {
        self.undo_decrements(&applied).await;
        let available = self.reservations.get_available_stock(item.product_id).await?;
        return Err(AppError::InsufficientStock { available });
      }
      applied.push((item.product_id, item.quantity));
    }
    Ok(applied)
  }

  async fn undo_decrements(&self, line_items: &[(Uuid, i32)]) {
    for (product_id, quantity) in line_items {
      if let Err(e) = self.products.increment_stock(*product_id, *quantity).await {
        warn!(%product_id, error = %e, "Failed to return stock after aborted order");
      }
    }
  }
}
