// src/models/product.rs

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i32,
  // Authoritative stock count. Mutated only through the conditional
  // decrement / unconditional increment issued by this core.
  pub stock: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
