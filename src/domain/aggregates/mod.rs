//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;
pub mod user;

pub use product::{Category, Product, ProductPatch, MAX_STOCK};
pub use order::{Order, OrderStatus};
pub use cart::{total_of, Cart, Item};
pub use user::{Role, User};
