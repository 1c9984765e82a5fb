//! Product and Category aggregates

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{validate_price, Quantity, Sku};
use crate::error::ShopError;

/// Largest stock count a product may carry (the column is a signed 32-bit integer).
pub const MAX_STOCK: u32 = i32::MAX as u32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub sku: Sku,
    pub stock: u32,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn create(sku: Sku, name: impl Into<String>, price: Decimal, stock: u32, category: Option<String>, now: DateTime<Utc>) -> Result<Self, ShopError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ShopError::Invalid("product name must not be empty".into())); }
        if stock > MAX_STOCK { return Err(ShopError::Invalid(format!("stock must be at most {MAX_STOCK}"))); }
        Ok(Self { id: Uuid::now_v7(), name, price: validate_price(price)?, sku, stock, category, created_at: now })
    }

    pub fn is_in_stock(&self) -> bool { self.stock > 0 }

    /// Read-only availability check; never mutates stock.
    pub fn ensure_available(&self, requested: Quantity) -> Result<(), ShopError> {
        if self.stock < requested.get() {
            return Err(ShopError::InsufficientStock { sku: self.sku.clone(), name: self.name.clone(), available: self.stock });
        }
        Ok(())
    }
}

/// Partial update applied by administrators. The SKU itself is immutable.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

impl ProductPatch {
    pub fn validated(self) -> Result<Self, ShopError> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() { return Err(ShopError::Invalid("product name must not be empty".into())); }
        }
        if let Some(price) = self.price { validate_price(price)?; }
        if matches!(self.stock, Some(s) if s > MAX_STOCK) { return Err(ShopError::Invalid(format!("stock must be at most {MAX_STOCK}"))); }
        Ok(Self { name: self.name.map(|n| n.trim().to_string()), ..self })
    }

    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name { product.name = name.clone(); }
        if let Some(price) = self.price { product.price = price; }
        if let Some(stock) = self.stock { product.stock = stock; }
        if let Some(category) = &self.category { product.category = Some(category.clone()); }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn create(name: impl Into<String>, description: impl Into<String>, now: DateTime<Utc>) -> Result<Self, ShopError> {
        let name = name.into().trim().to_string();
        if name.is_empty() { return Err(ShopError::Invalid("category name must not be empty".into())); }
        Ok(Self { id: Uuid::now_v7(), name, description: description.into(), created_at: now })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mouse(stock: u32) -> Product {
        Product::create(Sku::new("9874U").unwrap(), "logiMouse", Decimal::new(1240, 2), stock, Some("Technology".into()), Utc::now()).unwrap()
    }

    #[test]
    fn test_product_create() {
        let p = mouse(90);
        assert_eq!(p.name, "logiMouse");
        assert!(p.is_in_stock());
    }

    #[test]
    fn test_availability() {
        let p = mouse(5);
        assert!(p.ensure_available(Quantity::new(5).unwrap()).is_ok());
        match p.ensure_available(Quantity::new(6).unwrap()) {
            Err(ShopError::InsufficientStock { available, .. }) => assert_eq!(available, 5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_create_rejects_blank_name() {
        assert!(Product::create(Sku::new("A1").unwrap(), "  ", Decimal::ONE, 1, None, Utc::now()).is_err());
    }

    #[test]
    fn test_patch_applies_only_given_fields() {
        let mut p = mouse(5);
        let patch = ProductPatch { price: Some(Decimal::new(999, 2)), ..Default::default() }.validated().unwrap();
        patch.apply(&mut p);
        assert_eq!(p.price, Decimal::new(999, 2));
        assert_eq!(p.stock, 5);
        assert_eq!(p.name, "logiMouse");
    }
}
