// tests/support/mod.rs

//! Shared harness: wires the full service graph over the in-memory stores.

// Each integration-test binary compiles this module separately and uses a
// different subset of helpers.
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

use storefront_core::config::AppConfig;
use storefront_core::db::memory::{InMemoryOrderStore, InMemoryProductStore, InMemoryReservationStore};
use storefront_core::models::{Order, OrderItem, OrderStatus, PaymentMethod, Product};
use storefront_core::services::email::RecordingMailer;
use storefront_core::services::mercado_pago::MockPaymentProvider;
use storefront_core::state::AppState;

pub struct TestApp {
  pub state: AppState,
  pub products: Arc<InMemoryProductStore>,
  pub reservation_store: Arc<InMemoryReservationStore>,
  pub order_store: Arc<InMemoryOrderStore>,
  pub mailer: Arc<RecordingMailer>,
  pub payments: Arc<MockPaymentProvider>,
  pub config: Arc<AppConfig>,
}

pub fn test_config(webhook_secret: Option<&str>) -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    database_url: "postgres://unused".to_string(),
    cron_secret: "test-cron-secret".to_string(),
    mp_access_token: "test-access-token".to_string(),
    mp_webhook_secret: webhook_secret.map(String::from),
    mp_api_base_url: "http://localhost:0".to_string(),
    mp_expiration_minutes: 60,
    transfer_expiration_hours: 48,
    pickup_expiration_hours: 72,
    reservation_ttl_minutes: 15,
    email_sender: "noreply@example.com".to_string(),
  }
}

pub fn test_app() -> TestApp {
  test_app_with_secret(None)
}

pub fn test_app_with_secret(webhook_secret: Option<&str>) -> TestApp {
  let config = Arc::new(test_config(webhook_secret));
  let products = Arc::new(InMemoryProductStore::new());
  let reservation_store = Arc::new(InMemoryReservationStore::new());
  let order_store = Arc::new(InMemoryOrderStore::new(products.clone()));
  let mailer = Arc::new(RecordingMailer::new());
  let payments = Arc::new(MockPaymentProvider::new());

  let state = AppState::assemble(
    config.clone(),
    products.clone(),
    reservation_store.clone(),
    order_store.clone(),
    mailer.clone(),
    payments.clone(),
  );

  TestApp {
    state,
    products,
    reservation_store,
    order_store,
    mailer,
    payments,
    config,
  }
}

pub fn seed_product(app: &TestApp, stock: i32, price_cents: i32) -> Uuid {
  let id = Uuid::new_v4();
  let now = Utc::now();
  app.products.insert(Product {
    id,
    name: format!("product-{}", id.simple()),
    price_cents,
    stock,
    created_at: now,
    updated_at: now,
  });
  id
}

/// A deferred-payment order sitting in its method's holding state, inserted
/// directly through the store the way checkout would have left it.
pub async fn seed_held_order(
  app: &TestApp,
  product_id: Uuid,
  quantity: i32,
  method: PaymentMethod,
  created_at: DateTime<Utc>,
  expires_at: DateTime<Utc>,
) -> Order {
  seed_held_order_for(app, product_id, quantity, method, created_at, expires_at, "ana@example.com").await
}

pub async fn seed_held_order_for(
  app: &TestApp,
  product_id: Uuid,
  quantity: i32,
  method: PaymentMethod,
  created_at: DateTime<Utc>,
  expires_at: DateTime<Utc>,
  customer_email: &str,
) -> Order {
  use storefront_core::db::OrderStore;

  let order_id = Uuid::new_v4();
  let order = Order {
    id: order_id,
    status: method.holding_status(),
    total_cents: 1000 * i64::from(quantity),
    payment_method: method,
    customer_name: "Ana".to_string(),
    customer_email: customer_email.to_string(),
    customer_phone: None,
    expires_at: Some(expires_at),
    payment_reminder_sent: false,
    mp_payment_id: None,
    mp_status: None,
    created_at,
    updated_at: created_at,
  };
  let items = vec![OrderItem {
    id: Uuid::new_v4(),
    order_id,
    product_id,
    quantity,
    price_cents: 1000,
  }];
  app
    .order_store
    .insert_with_items(&order, &items)
    .await
    .expect("seed order");
  order
}

pub async fn order_status(app: &TestApp, order_id: Uuid) -> OrderStatus {
  use storefront_core::db::OrderStore;
  app
    .order_store
    .get(order_id)
    .await
    .expect("get order")
    .expect("order exists")
    .status
}

pub async fn product_stock(app: &TestApp, product_id: Uuid) -> i32 {
  use storefront_core::db::ProductStore;
  app
    .products
    .get(product_id)
    .await
    .expect("get product")
    .expect("product exists")
    .stock
}

/// Timestamps for an order created `age` ago under the given expiration
/// window.
pub fn aged(age: Duration, window: Duration) -> (DateTime<Utc>, DateTime<Utc>) {
  let created_at = Utc::now() - age;
  (created_at, created_at + window)
}
