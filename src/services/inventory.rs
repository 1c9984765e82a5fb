//! Stock checks and movements, usable on the store or inside a transaction.
use uuid::Uuid;

use crate::domain::aggregates::Product;
use crate::domain::value_objects::{Quantity, Sku};
use crate::error::{Result, ShopError};
use crate::store::Inventory;

/// Read-only: the product, if it has at least `requested` in stock.
pub async fn check_availability<I: Inventory + ?Sized>(inventory: &I, sku: &Sku, requested: Quantity) -> Result<Product> {
    let product = inventory.product_by_sku(sku).await?.ok_or_else(|| ShopError::ProductNotFound(sku.clone()))?;
    product.ensure_available(requested)?;
    Ok(product)
}

/// Conditional decrement. Stock never drops below zero, whatever runs concurrently.
#[tracing::instrument(level = "debug", skip(inventory))]
pub async fn decrement_stock<I: Inventory + ?Sized>(inventory: &I, sku: &Sku, quantity: Quantity) -> Result<()> {
    if inventory.decrement_stock(sku, quantity).await? {
        return Ok(());
    }
    match inventory.product_by_sku(sku).await? {
        None => Err(ShopError::ProductNotFound(sku.clone())),
        Some(p) => Err(ShopError::InsufficientStock { sku: p.sku, name: p.name, available: p.stock }),
    }
}

pub async fn restock<I: Inventory + ?Sized>(inventory: &I, product_id: Uuid, quantity: Quantity) -> Result<()> {
    if !inventory.increment_stock(product_id, quantity).await? {
        tracing::warn!(%product_id, "restock skipped, product no longer exists");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Store};
    use chrono::Utc;
    use rust_decimal::Decimal;

    async fn store_with(stock: u32) -> (MemoryStore, Sku) {
        let store = MemoryStore::new();
        let sku = Sku::new("ABC").unwrap();
        store.insert_product(&Product::create(sku.clone(), "Widget", Decimal::from(10), stock, None, Utc::now()).unwrap()).await.unwrap();
        (store, sku)
    }

    #[tokio::test]
    async fn test_decrement_reports_available_stock() {
        let (store, sku) = store_with(2).await;
        let err = decrement_stock(&store, &sku, Quantity::new(3).unwrap()).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock { available: 2, .. }));
        decrement_stock(&store, &sku, Quantity::new(2).unwrap()).await.unwrap();
        assert_eq!(store.product_by_sku(&sku).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_unknown_sku() {
        let (store, _) = store_with(2).await;
        let missing = Sku::new("NOPE").unwrap();
        assert!(matches!(decrement_stock(&store, &missing, Quantity::new(1).unwrap()).await, Err(ShopError::ProductNotFound(_))));
        assert!(matches!(check_availability(&store, &missing, Quantity::new(1).unwrap()).await, Err(ShopError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_availability_does_not_mutate() {
        let (store, sku) = store_with(5).await;
        check_availability(&store, &sku, Quantity::new(5).unwrap()).await.unwrap();
        assert_eq!(store.product_by_sku(&sku).await.unwrap().unwrap().stock, 5);
    }
}
