// src/db/memory.rs

//! In-memory store implementations, kept next to the Postgres ones so the
//! integration tests and local development runs can drive the full service
//! graph without a database. State lives behind `parking_lot` mutexes; no
//! method awaits while holding a lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::{OrderStore, ProductStore, ReservationStore};
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderStatus, PaymentMethod, Product, StockReservation};

#[derive(Default)]
pub struct InMemoryProductStore {
  products: Mutex<HashMap<Uuid, Product>>,
}

impl InMemoryProductStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn insert(&self, product: Product) {
    self.products.lock().insert(product.id, product);
  }

  /// Restores stock for all items or none: the product set is validated
  /// before the first mutation, which is what lets the order store keep its
  /// cancel-and-restore atomic.
  pub(crate) fn restore_many(&self, items: &[OrderItem]) -> Result<i32> {
    let mut products = self.products.lock();
    for item in items {
      if !products.contains_key(&item.product_id) {
        return Err(AppError::NotFound(format!("Product {} not found", item.product_id)));
      }
    }
    let mut restored = 0;
    for item in items {
      if let Some(product) = products.get_mut(&item.product_id) {
        product.stock += item.quantity;
        product.updated_at = Utc::now();
        restored += item.quantity;
      }
    }
    Ok(restored)
  }
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
  async fn get(&self, id: Uuid) -> Result<Option<Product>> {
    Ok(self.products.lock().get(&id).cloned())
  }

  async fn try_decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool> {
    let mut products = self.products.lock();
    match products.get_mut(&id) {
      Some(product) if product.stock >= quantity => {
        product.stock -= quantity;
        product.updated_at = Utc::now();
        Ok(true)
      }
      Some(_) => Ok(false),
      None => Err(AppError::NotFound(format!("Product {} not found", id))),
    }
  }

  async fn increment_stock(&self, id: Uuid, quantity: i32) -> Result<()> {
    let mut products = self.products.lock();
    match products.get_mut(&id) {
      Some(product) => {
        product.stock += quantity;
        product.updated_at = Utc::now();
        Ok(())
      }
      None => Err(AppError::NotFound(format!("Product {} not found", id))),
    }
  }
}

#[derive(Default)]
pub struct InMemoryReservationStore {
  rows: Mutex<Vec<StockReservation>>,
}

impl InMemoryReservationStore {
  pub fn new() -> Self {
    Self::default()
  }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
  async fn insert(&self, reservation: StockReservation) -> Result<()> {
    self.rows.lock().push(reservation);
    Ok(())
  }

  async fn sum_active_for_product(&self, product_id: Uuid, now: DateTime<Utc>) -> Result<i64> {
    let sum = self
      .rows
      .lock()
      .iter()
      .filter(|r| r.product_id == product_id && r.is_active(now))
      .map(|r| i64::from(r.quantity))
      .sum();
    Ok(sum)
  }

  async fn list_for_session(&self, session_id: &str) -> Result<Vec<StockReservation>> {
    Ok(
      self
        .rows
        .lock()
        .iter()
        .filter(|r| r.session_id == session_id)
        .cloned()
        .collect(),
    )
  }

  async fn delete_for_session(&self, session_id: &str) -> Result<u64> {
    let mut rows = self.rows.lock();
    let before = rows.len();
    rows.retain(|r| r.session_id != session_id);
    Ok((before - rows.len()) as u64)
  }

  async fn delete_one(&self, id: Uuid) -> Result<()> {
    self.rows.lock().retain(|r| r.id != id);
    Ok(())
  }

  async fn extend_for_session(&self, session_id: &str, new_expiry: DateTime<Utc>) -> Result<u64> {
    let mut rows = self.rows.lock();
    let mut touched = 0;
    for row in rows.iter_mut().filter(|r| r.session_id == session_id) {
      row.expires_at = new_expiry;
      touched += 1;
    }
    Ok(touched)
  }

  async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
    let mut rows = self.rows.lock();
    let before = rows.len();
    rows.retain(|r| r.expires_at > now);
    Ok((before - rows.len()) as u64)
  }
}

pub struct InMemoryOrderStore {
  orders: Mutex<HashMap<Uuid, Order>>,
  items: Mutex<HashMap<Uuid, Vec<OrderItem>>>,
  products: Arc<InMemoryProductStore>,
}

impl InMemoryOrderStore {
  /// Takes the product store so cancel-and-restore can touch both tables
  /// under its own control, mirroring the single transaction the Postgres
  /// implementation uses.
  pub fn new(products: Arc<InMemoryProductStore>) -> Self {
    Self {
      orders: Mutex::new(HashMap::new()),
      items: Mutex::new(HashMap::new()),
      products,
    }
  }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
  async fn insert_with_items(&self, order: &Order, items: &[OrderItem]) -> Result<()> {
    self.orders.lock().insert(order.id, order.clone());
    self.items.lock().insert(order.id, items.to_vec());
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<Option<Order>> {
    Ok(self.orders.lock().get(&id).cloned())
  }

  async fn items_for_order(&self, order_id: Uuid) -> Result<Vec<OrderItem>> {
    Ok(self.items.lock().get(&order_id).cloned().unwrap_or_default())
  }

  async fn set_status(&self, id: Uuid, status: OrderStatus) -> Result<()> {
    let mut orders = self.orders.lock();
    let order = orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    order.status = status;
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn record_payment_result(
    &self,
    id: Uuid,
    status: OrderStatus,
    mp_payment_id: &str,
    mp_status: &str,
  ) -> Result<()> {
    let mut orders = self.orders.lock();
    let order = orders
      .get_mut(&id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", id)))?;
    order.status = status;
    order.mp_payment_id = Some(mp_payment_id.to_string());
    order.mp_status = Some(mp_status.to_string());
    order.updated_at = Utc::now();
    Ok(())
  }

  async fn find_expired_held(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<Order>> {
    let orders = self.orders.lock();
    let mut expired: Vec<Order> = orders.values().filter(|o| o.is_expired(now)).cloned().collect();
    expired.sort_by_key(|o| o.expires_at);
    expired.truncate(limit as usize);
    Ok(expired)
  }

  async fn find_reminder_candidates(
    &self,
    method: PaymentMethod,
    holding_status: OrderStatus,
    created_after: DateTime<Utc>,
    created_before: DateTime<Utc>,
    limit: i64,
  ) -> Result<Vec<Order>> {
    let orders = self.orders.lock();
    let mut candidates: Vec<Order> = orders
      .values()
      .filter(|o| {
        o.payment_method == method
          && o.status == holding_status
          && !o.payment_reminder_sent
          && o.created_at > created_after
          && o.created_at <= created_before
      })
      .cloned()
      .collect();
    candidates.sort_by_key(|o| o.created_at);
    candidates.truncate(limit as usize);
    Ok(candidates)
  }

  async fn mark_reminder_sent(&self, id: Uuid) -> Result<()> {
    let mut orders = self.orders.lock();
    if let Some(order) = orders.get_mut(&id) {
      order.payment_reminder_sent = true;
      order.updated_at = Utc::now();
    }
    Ok(())
  }

  async fn cancel_and_restore(&self, order: &Order) -> Result<Option<i32>> {
    let items = self.items.lock().get(&order.id).cloned().unwrap_or_default();

    let mut orders = self.orders.lock();
    let stored = orders
      .get_mut(&order.id)
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order.id)))?;
    if !stored.status.is_held() {
      return Ok(None);
    }

    // Validate-then-mutate keeps this all-or-nothing, matching the Postgres
    // transaction: a missing product leaves the order untouched.
    let restored = self.products.restore_many(&items)?;
    stored.status = OrderStatus::Cancelled;
    stored.updated_at = Utc::now();
    Ok(Some(restored))
  }
}
