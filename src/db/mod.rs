// src/db/mod.rs

//! Persistence ports and their implementations. Every store is a trait so the
//! services receive `Arc<dyn Store>` via `AppState`; construction and
//! lifecycle belong to the process entry point, never to module-level state.

pub mod memory;
pub mod order_store;
pub mod product_store;
pub mod reservation_store;

pub use order_store::{OrderStore, PgOrderStore};
pub use product_store::{PgProductStore, ProductStore};
pub use reservation_store::{PgReservationStore, ReservationStore};
