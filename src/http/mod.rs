//! HTTP surface: axum router, request extractors and JSON views.
use std::sync::Arc;

use axum::{routing::{get, post, put}, Json, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::TokenIssuer;
use crate::services::{AccountService, CartService, CatalogService, CheckoutService, Deps, OrderService};

mod cart;
mod catalog;
mod extract;
mod orders;
mod users;
mod views;

pub use extract::{AdminUser, AuthUser, JsonBody};
pub use views::{CartView, ItemView, OrderView, ProductView};

#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub tokens: Arc<TokenIssuer>,
}

impl AppState {
    pub fn new(deps: Deps, tokens: TokenIssuer) -> Self {
        let tokens = Arc::new(tokens);
        Self {
            accounts: AccountService::new(deps.clone(), tokens.clone()),
            catalog: CatalogService::new(deps.clone()),
            carts: CartService::new(deps.clone()),
            checkout: CheckoutService::new(deps.clone()),
            orders: OrderService::new(deps),
            tokens,
        }
    }
}

/// All API routes, mounted under `prefix` (empty or `/` mounts them at the root).
pub fn router(state: AppState, prefix: &str) -> Router {
    let api = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "shopping-basket"})) }))
        .route("/users/signup", post(users::signup))
        .route("/users/login", post(users::login))
        .route("/users/refresh", post(users::refresh))
        .route("/products", get(catalog::list_products).post(catalog::create_product))
        .route("/products/search", get(catalog::search_products))
        .route("/products/batch", post(catalog::create_products))
        .route("/products/:sku", put(catalog::update_product).delete(catalog::delete_product))
        .route("/categories", get(catalog::list_categories).post(catalog::create_category))
        .route("/categories/batch", post(catalog::create_categories))
        .route("/cart", get(cart::view))
        .route("/cart/items", post(cart::add_item))
        .route("/cart/items/:sku", put(cart::update_item).delete(cart::remove_item))
        .route("/orders", get(orders::history).post(orders::place))
        .route("/orders/:id/cancel", post(orders::cancel));

    let prefix = prefix.trim_end_matches('/');
    let app = if prefix.is_empty() { api } else { Router::new().nest(prefix, api) };
    app.layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}
