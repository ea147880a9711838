// src/db/product_store.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::Result;
use crate::models::Product;

/// Port over the authoritative product stock. The `stock` column is the one
/// piece of truly shared mutable state in the system, so every decrement is
/// conditional (`stock >= quantity`) and every restoration is an
/// unconditional, commutative increment.
#[async_trait]
pub trait ProductStore: Send + Sync {
  async fn get(&self, id: Uuid) -> Result<Option<Product>>;

  /// Decrement `stock` by `quantity` only if the live value covers it.
  /// Returns `false` (without mutating) when it does not; the caller decides
  /// whether that is an `InsufficientStock` failure.
  async fn try_decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool>;

  /// Unconditional increment, used when a cancelled order's stock is
  /// restored.
  async fn increment_stock(&self, id: Uuid, quantity: i32) -> Result<()>;
}

pub struct PgProductStore {
  pool: PgPool,
}

impl PgProductStore {
  pub fn new(pool: PgPool) -> Self {
    Self { pool }
  }
}

#[async_trait]
impl ProductStore for PgProductStore {
  async fn get(&self, id: Uuid) -> Result<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(
      "SELECT id, name, price_cents, stock, created_at, updated_at FROM products WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(&self.pool)
    .await?;
    Ok(product)
  }

  async fn try_decrement_stock(&self, id: Uuid, quantity: i32) -> Result<bool> {
    // The `stock >= $2` guard is what keeps stock non-negative under
    // concurrent confirms; the row lock taken by UPDATE serializes rivals.
    let result = sqlx::query("UPDATE products SET stock = stock - $2, updated_at = NOW() WHERE id = $1 AND stock >= $2")
      .bind(id)
      .bind(quantity)
      .execute(&self.pool)
      .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn increment_stock(&self, id: Uuid, quantity: i32) -> Result<()> {
    let result = sqlx::query("UPDATE products SET stock = stock + $2, updated_at = NOW() WHERE id = $1")
      .bind(id)
      .bind(quantity)
      .execute(&self.pool)
      .await?;
    if result.rows_affected() == 0 {
      return Err(crate::errors::AppError::NotFound(format!("Product {} not found", id)));
    }
    Ok(())
  }
}
