// tests/checkout_orders.rs

mod support;

use storefront_core::db::OrderStore;
use storefront_core::errors::AppError;
use storefront_core::models::{OrderStatus, PaymentMethod};
use storefront_core::services::orders::{PlaceOrderItem, PlaceOrderRequest};
use support::{product_stock, seed_product, test_app};

fn request(session: &str, method: PaymentMethod) -> PlaceOrderRequest {
  PlaceOrderRequest {
    session_id: session.to_string(),
    payment_method: method,
    customer_name: "Ana".to_string(),
    customer_email: "ana@example.com".to_string(),
    customer_phone: None,
    items: vec![],
  }
}

#[tokio::test]
async fn checkout_confirms_reservation_and_freezes_prices() {
  let app = test_app();
  let product_id = seed_product(&app, 10, 2500);

  app
    .state
    .reservations
    .create_reservation(product_id, 2, "session-a")
    .await
    .unwrap();

  let order = app
    .state
    .orders
    .place_order(&request("session-a", PaymentMethod::Mercadopago))
    .await
    .expect("checkout succeeds");

  assert_eq!(order.status, OrderStatus::PendingPayment);
  assert_eq!(order.total_cents, 5000);
  assert!(order.expires_at.is_some());
  assert!(!order.payment_reminder_sent);

  // Stock permanently decremented, holds consumed, line price frozen.
  assert_eq!(product_stock(&app, product_id).await, 8);
  let items = app.order_store.items_for_order(order.id).await.unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0].price_cents, 2500);
  assert_eq!(items[0].quantity, 2);

  // Confirmation email went out.
  assert_eq!(app.mailer.sent_count(), 1);
}

#[tokio::test]
async fn checkout_method_decides_holding_state_and_window() {
  let app = test_app();
  let product_id = seed_product(&app, 10, 1000);

  for (method, expected_status) in [
    (PaymentMethod::BankTransfer, OrderStatus::WaitingTransferProof),
    (PaymentMethod::CashOnPickup, OrderStatus::Reserved),
  ] {
    let session = format!("session-{:?}", method);
    app
      .state
      .reservations
      .create_reservation(product_id, 1, &session)
      .await
      .unwrap();
    let order = app.state.orders.place_order(&request(&session, method)).await.unwrap();
    assert_eq!(order.status, expected_status);

    let window = order.expires_at.unwrap() - order.created_at;
    let expected_window = method.expiration(&app.config);
    assert_eq!(window, expected_window);
  }
}

#[tokio::test]
async fn checkout_without_reservation_decrements_directly() {
  let app = test_app();
  let product_id = seed_product(&app, 3, 1000);

  let mut req = request("fresh-session", PaymentMethod::BankTransfer);
  req.items = vec![PlaceOrderItem { product_id, quantity: 2 }];

  let order = app.state.orders.place_order(&req).await.expect("direct checkout");
  assert_eq!(order.total_cents, 2000);
  assert_eq!(product_stock(&app, product_id).await, 1);
}

#[tokio::test]
async fn checkout_without_reservation_rejects_overdraw() {
  let app = test_app();
  let product_id = seed_product(&app, 3, 1000);

  let mut req = request("fresh-session", PaymentMethod::Mercadopago);
  req.items = vec![PlaceOrderItem { product_id, quantity: 4 }];

  let err = app.state.orders.place_order(&req).await.expect_err("not enough stock");
  assert!(matches!(err, AppError::InsufficientStock { .. }));
  assert_eq!(product_stock(&app, product_id).await, 3); // untouched
}

#[tokio::test]
async fn admin_happy_path_follows_transition_table() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);
  app
    .state
    .reservations
    .create_reservation(product_id, 1, "session-a")
    .await
    .unwrap();
  let order = app
    .state
    .orders
    .place_order(&request("session-a", PaymentMethod::Mercadopago))
    .await
    .unwrap();

  // PENDING_PAYMENT -> PROCESSED -> DELIVERED
  let order = app
    .state
    .state_machine
    .transition(order.id, OrderStatus::Processed)
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::Processed);
  let order = app
    .state
    .state_machine
    .transition(order.id, OrderStatus::Delivered)
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::Delivered);

  // Terminal: nothing leaves DELIVERED.
  let err = app
    .state
    .state_machine
    .transition(order.id, OrderStatus::Pending)
    .await
    .expect_err("delivered is terminal");
  assert!(matches!(err, AppError::IllegalTransition { .. }));
}

#[tokio::test]
async fn admin_cancel_of_held_order_restores_stock() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);
  app
    .state
    .reservations
    .create_reservation(product_id, 2, "session-a")
    .await
    .unwrap();
  let order = app
    .state
    .orders
    .place_order(&request("session-a", PaymentMethod::BankTransfer))
    .await
    .unwrap();
  assert_eq!(product_stock(&app, product_id).await, 3);

  let order = app
    .state
    .state_machine
    .transition(order.id, OrderStatus::Cancelled)
    .await
    .unwrap();
  assert_eq!(order.status, OrderStatus::Cancelled);
  assert_eq!(product_stock(&app, product_id).await, 5);

  // Checkout confirmation + cancellation notification.
  assert_eq!(app.mailer.sent_count(), 2);
}

#[tokio::test]
async fn illegal_jump_is_rejected() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);
  app
    .state
    .reservations
    .create_reservation(product_id, 1, "session-a")
    .await
    .unwrap();
  let order = app
    .state
    .orders
    .place_order(&request("session-a", PaymentMethod::Mercadopago))
    .await
    .unwrap();

  let err = app
    .state
    .state_machine
    .transition(order.id, OrderStatus::Delivered)
    .await
    .expect_err("held order cannot jump to delivered");
  assert!(matches!(
    err,
    AppError::IllegalTransition {
      from: OrderStatus::PendingPayment,
      to: OrderStatus::Delivered
    }
  ));
}
