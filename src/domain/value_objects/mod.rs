//! Value Objects for the shopping basket

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ShopError;

/// SKU (Stock Keeping Unit) value object
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sku(String);

impl Sku {
    pub const MAX_LEN: usize = 50;

    pub fn new(value: impl Into<String>) -> Result<Self, ShopError> {
        let value = value.into().trim().to_uppercase();
        if value.is_empty() { return Err(ShopError::Invalid("SKU must not be empty".into())); }
        if value.len() > Self::MAX_LEN { return Err(ShopError::Invalid(format!("SKU longer than {} characters", Self::MAX_LEN))); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Sku {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<String> for Sku {
    type Error = ShopError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Sku> for String {
    fn from(sku: Sku) -> Self { sku.0 }
}

/// Positive line-item quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const MAX: u32 = 10_000;

    pub fn new(value: u32) -> Result<Self, ShopError> {
        if value == 0 { return Err(ShopError::Invalid("quantity must be at least 1".into())); }
        if value > Self::MAX { return Err(ShopError::Invalid(format!("quantity must be at most {}", Self::MAX))); }
        Ok(Self(value))
    }
    pub fn get(self) -> u32 { self.0 }

    /// Line total for this quantity at the given unit price.
    pub fn times(self, unit_price: Decimal) -> Result<Decimal, ShopError> {
        unit_price.checked_mul(Decimal::from(self.0))
            .ok_or_else(|| ShopError::Invalid(format!("line total for {} x {unit_price} is out of range", self.0)))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

impl TryFrom<u32> for Quantity {
    type Error = ShopError;
    fn try_from(value: u32) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

/// Largest accepted unit price. `MAX_PRICE * Quantity::MAX` times the largest
/// cart still fits a `NUMERIC(14, 2)` total.
pub const MAX_PRICE: Decimal = Decimal::from_parts(99_999_999, 0, 0, false, 2);

/// Validates a unit price: non-negative, at most [`MAX_PRICE`], at most two decimal places.
pub fn validate_price(price: Decimal) -> Result<Decimal, ShopError> {
    if price.is_sign_negative() { return Err(ShopError::Invalid("price must not be negative".into())); }
    if price > MAX_PRICE { return Err(ShopError::Invalid(format!("price must be at most {MAX_PRICE}"))); }
    if price.normalize().scale() > 2 { return Err(ShopError::Invalid("price has more than two decimal places".into())); }
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_sku() { let sku = Sku::new(" prod-001 ").unwrap(); assert_eq!(sku.as_str(), "PROD-001"); }
    #[test]
    fn test_sku_rejects_blank_and_long() {
        assert!(Sku::new("   ").is_err());
        assert!(Sku::new("X".repeat(51)).is_err());
    }
    #[test]
    fn test_quantity_bounds() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(Quantity::MAX + 1).is_err());
        assert_eq!(Quantity::new(3).unwrap().times(Decimal::new(1050, 2)).unwrap(), Decimal::new(3150, 2));
        assert!(Quantity::new(10).unwrap().times(Decimal::MAX).is_err());
    }
    #[test]
    fn test_quantity_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }
    #[test]
    fn test_price_validation() {
        assert!(validate_price(Decimal::new(-1, 0)).is_err());
        assert!(validate_price(Decimal::new(1001, 3)).is_err());
        assert!(validate_price(Decimal::new(1000, 3)).is_ok());
        assert!(validate_price(MAX_PRICE).is_ok());
        assert!(validate_price(MAX_PRICE + Decimal::new(1, 2)).is_err());
        assert!(validate_price(Decimal::from_str_exact("70000000000000000000000000000").unwrap()).is_err());
    }
}
