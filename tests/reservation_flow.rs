// tests/reservation_flow.rs

mod support;

use chrono::{Duration, Utc};
use storefront_core::db::ReservationStore;
use storefront_core::errors::AppError;
use storefront_core::models::StockReservation;
use support::{product_stock, seed_product, test_app};
use uuid::Uuid;

#[tokio::test]
async fn second_session_fails_when_holds_exhaust_stock() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  let reservation = app
    .state
    .reservations
    .create_reservation(product_id, 3, "session-a")
    .await
    .expect("first hold fits");
  assert_eq!(reservation.quantity, 3);
  assert_eq!(app.state.reservations.get_available_stock(product_id).await.unwrap(), 2);

  let err = app
    .state
    .reservations
    .create_reservation(product_id, 3, "session-b")
    .await
    .expect_err("second hold exceeds availability");
  match err {
    AppError::InsufficientStock { available } => assert_eq!(available, 2),
    other => panic!("expected InsufficientStock, got {:?}", other),
  }

  // Authoritative stock is untouched by holds.
  assert_eq!(product_stock(&app, product_id).await, 5);
}

#[tokio::test]
async fn release_restores_availability_exactly() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  app
    .state
    .reservations
    .create_reservation(product_id, 2, "session-a")
    .await
    .unwrap();
  assert_eq!(app.state.reservations.get_available_stock(product_id).await.unwrap(), 3);

  app.state.reservations.release_reservation("session-a").await.unwrap();
  assert_eq!(app.state.reservations.get_available_stock(product_id).await.unwrap(), 5);

  // Releasing again is a no-op.
  let released = app.state.reservations.release_reservation("session-a").await.unwrap();
  assert_eq!(released, 0);
}

#[tokio::test]
async fn expired_holds_are_excluded_before_garbage_collection() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  // An expired row that the GC has not collected yet.
  app
    .reservation_store
    .insert(StockReservation {
      id: Uuid::new_v4(),
      product_id,
      quantity: 4,
      session_id: "stale-session".to_string(),
      expires_at: Utc::now() - Duration::minutes(1),
    })
    .await
    .unwrap();

  assert_eq!(app.state.reservations.get_available_stock(product_id).await.unwrap(), 5);

  let removed = app.state.reservations.clean_expired_reservations().await.unwrap();
  assert_eq!(removed, 1);
  assert_eq!(product_stock(&app, product_id).await, 5); // GC never touches stock
}

#[tokio::test]
async fn extend_pushes_expiry_forward() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  let created = app
    .state
    .reservations
    .create_reservation(product_id, 1, "session-a")
    .await
    .unwrap();

  app.state.reservations.extend_reservation("session-a").await.unwrap();
  let rows = app.reservation_store.list_for_session("session-a").await.unwrap();
  assert_eq!(rows.len(), 1);
  assert!(rows[0].expires_at >= created.expires_at);
}

#[tokio::test]
async fn confirm_decrements_stock_and_consumes_holds() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  app
    .state
    .reservations
    .create_reservation(product_id, 3, "session-a")
    .await
    .unwrap();
  let confirmed = app.state.reservations.confirm_reservation("session-a").await.unwrap();

  assert_eq!(confirmed.len(), 1);
  assert_eq!(product_stock(&app, product_id).await, 2);
  assert!(app.reservation_store.list_for_session("session-a").await.unwrap().is_empty());
}

#[tokio::test]
async fn confirm_of_unknown_session_is_not_found() {
  let app = test_app();
  let err = app
    .state
    .reservations
    .confirm_reservation("no-such-session")
    .await
    .expect_err("nothing to confirm");
  assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn racing_confirms_cannot_oversell() {
  let app = test_app();
  let product_id = seed_product(&app, 5, 1000);

  // Two sessions holding 3 each against stock 5. The optimistic create
  // check would normally stop the second, so plant the rows directly: this
  // is exactly the race the confirm-time re-validation exists for.
  for session in ["session-a", "session-b"] {
    app
      .reservation_store
      .insert(StockReservation {
        id: Uuid::new_v4(),
        product_id,
        quantity: 3,
        session_id: session.to_string(),
        expires_at: Utc::now() + Duration::minutes(15),
      })
      .await
      .unwrap();
  }

  let (a, b) = tokio::join!(
    app.state.reservations.confirm_reservation("session-a"),
    app.state.reservations.confirm_reservation("session-b"),
  );

  let failures = [&a, &b].iter().filter(|r| r.is_err()).count();
  assert_eq!(failures, 1, "exactly one session must lose the race");
  let losing_err = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
  assert!(matches!(losing_err, AppError::InsufficientStock { .. }));

  // 5 - 3 = 2, and never negative.
  assert_eq!(product_stock(&app, product_id).await, 2);
  assert!(app.state.reservations.get_available_stock(product_id).await.unwrap() >= 0);
}

#[tokio::test]
async fn confirm_shortfall_rolls_back_earlier_decrements() {
  let app = test_app();
  let product_a = seed_product(&app, 5, 1000);
  let product_b = seed_product(&app, 1, 2000);

  // One session holding both products. The hold on B was created while B
  // still had stock; by confirm time another order has drained it.
  for (product_id, quantity) in [(product_a, 2), (product_b, 2)] {
    app
      .reservation_store
      .insert(StockReservation {
        id: Uuid::new_v4(),
        product_id,
        quantity,
        session_id: "session-a".to_string(),
        expires_at: Utc::now() + Duration::minutes(15),
      })
      .await
      .unwrap();
  }

  let err = app
    .state
    .reservations
    .confirm_reservation("session-a")
    .await
    .expect_err("second line falls short");
  assert!(matches!(err, AppError::InsufficientStock { .. }));

  // A's decrement went through first and must have been handed back; no
  // partial fulfilment survives the failed confirmation.
  assert_eq!(product_stock(&app, product_a).await, 5);
  assert_eq!(product_stock(&app, product_b).await, 1);

  // Both holds stay in place so the caller can release or retry.
  let rows = app.reservation_store.list_for_session("session-a").await.unwrap();
  assert_eq!(rows.len(), 2);
}

#[tokio::test]
async fn availability_is_clamped_at_zero() {
  let app = test_app();
  let product_id = seed_product(&app, 2, 1000);

  // Overlapping optimistic holds can overshoot the stock figure.
  for session in ["s1", "s2"] {
    app
      .reservation_store
      .insert(StockReservation {
        id: Uuid::new_v4(),
        product_id,
        quantity: 2,
        session_id: session.to_string(),
        expires_at: Utc::now() + Duration::minutes(15),
      })
      .await
      .unwrap();
  }

  assert_eq!(app.state.reservations.get_available_stock(product_id).await.unwrap(), 0);
}
