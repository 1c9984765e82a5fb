//! Error types shared by the domain, the services and the HTTP layer.

use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::value_objects::Sku;
use crate::store::StoreError;

/// Coarse failure classes, mapped to HTTP statuses at the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    PreconditionFailed,
    Invalid,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::PreconditionFailed => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Invalid => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("Cart not found")]
    CartNotFound,

    #[error("Product with SKU {0} not found")]
    ProductNotFound(Sku),

    #[error("Order not found")]
    OrderNotFound,

    #[error("Category {0} not found")]
    CategoryNotFound(String),

    #[error("Product with SKU {0} is not in the cart, please add the product first")]
    NotInCart(Sku),

    #[error("Product with SKU {0} is already in the cart, please update the quantity")]
    AlreadyInCart(Sku),

    #[error("Cart already holds the maximum of {0} items")]
    CartFull(usize),

    #[error("Cart has already been checked out")]
    CartAlreadyCheckedOut,

    #[error("Order has already been canceled")]
    OrderAlreadyCanceled,

    #[error("Product with SKU {0} already exists")]
    DuplicateSku(Sku),

    #[error("Category {0} already exists")]
    DuplicateCategory(String),

    #[error("E-mail {0} is already registered")]
    DuplicateEmail(String),

    #[error("Product with SKU {0} is referenced by carts or orders")]
    ProductInUse(Sku),

    #[error("Not enough {name} in stock, please request at most {available}")]
    InsufficientStock { sku: Sku, name: String, available: u32 },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Order total {total} is below the minimum order value of {minimum}")]
    BelowMinimumOrder { total: Decimal, minimum: Decimal },

    #[error("Orders cannot be canceled more than {0} days after placement")]
    CancelWindowExpired(i64),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Missing or invalid authorization")]
    Unauthorized,

    #[error("You are not allowed to use this endpoint")]
    Forbidden,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn kind(&self) -> ErrorKind {
        use ShopError::*;
        match self {
            CartNotFound | ProductNotFound(_) | OrderNotFound | CategoryNotFound(_) | NotInCart(_) => ErrorKind::NotFound,
            AlreadyInCart(_) | CartFull(_) | CartAlreadyCheckedOut | OrderAlreadyCanceled | DuplicateSku(_)
            | DuplicateCategory(_) | DuplicateEmail(_) | ProductInUse(_) => ErrorKind::Conflict,
            InsufficientStock { .. } | EmptyCart | BelowMinimumOrder { .. } | CancelWindowExpired(_) => ErrorKind::PreconditionFailed,
            Invalid(_) => ErrorKind::Invalid,
            InvalidCredentials | Unauthorized => ErrorKind::Unauthorized,
            Forbidden => ErrorKind::Forbidden,
            Store(_) | Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(errors: validator::ValidationErrors) -> Self { ShopError::Invalid(errors.to_string()) }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(error = %self, "request failed");
                "internal server error".to_string()
            }
            _ => {
                tracing::warn!(error = %self, "request rejected");
                self.to_string()
            }
        };
        (kind.status(), Json(serde_json::json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_statuses() {
        assert_eq!(ShopError::CartNotFound.kind().status(), StatusCode::NOT_FOUND);
        assert_eq!(ShopError::CartFull(20).kind(), ErrorKind::Conflict);
        assert_eq!(ShopError::EmptyCart.kind().status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ShopError::Invalid("x".into()).kind().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ShopError::Forbidden.kind().status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_insufficient_stock_names_the_limit() {
        let err = ShopError::InsufficientStock { sku: Sku::new("SKU1").unwrap(), name: "Mouse".into(), available: 5 };
        assert_eq!(err.to_string(), "Not enough Mouse in stock, please request at most 5");
    }

    #[test]
    fn test_storage_errors_are_internal() {
        let err = ShopError::from(StoreError::Corrupt("bad row".into()));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
