// src/models/mod.rs

//! Data structures representing persisted entities.

pub mod order;
pub mod order_item;
pub mod payment_method;
pub mod product;
pub mod reservation;

pub use order::{Order, OrderStatus};
pub use order_item::OrderItem;
pub use payment_method::PaymentMethod;
pub use product::Product;
pub use reservation::StockReservation;
