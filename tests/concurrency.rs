mod common;

use futures::future::join_all;
use rust_decimal::Decimal;

use common::{harness, harness_with, qty, sku};
use shopping_basket::config::CheckoutPolicy;
use shopping_basket::services::inventory;
use shopping_basket::store::Store;
use shopping_basket::ShopError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_decrements_never_oversell() {
    let h = harness();
    h.product("SKU1", 10, 10).await;

    let tasks = (0..8).map(|_| {
        let store = h.store.clone();
        tokio::spawn(async move { inventory::decrement_stock(&*store, &sku("SKU1"), qty(3)).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 3);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(e, ShopError::InsufficientStock { .. })));
    assert_eq!(h.stock_of("SKU1").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_adds_leave_one_item() {
    let h = harness();
    h.product("SKU1", 10, 50).await;
    let user = h.user("a@shop.test").await;

    let tasks = (0..6).map(|_| {
        let carts = h.state.carts.clone();
        tokio::spawn(async move { carts.add_item(user.id, sku("SKU1"), qty(2)).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(e, ShopError::AlreadyInCart(_))));
    let cart = h.state.carts.view(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.total, Decimal::from(20));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_respect_the_cart_cap() {
    let h = harness_with(CheckoutPolicy { max_cart_items: 2, ..CheckoutPolicy::default() });
    let user = h.user("a@shop.test").await;
    let codes = ["B0", "B1", "B2", "B3", "B4", "B5", "B6", "B7"];
    for code in codes {
        h.product(code, 1, 10).await;
    }
    h.state.carts.add_item(user.id, sku("B0"), qty(1)).await.unwrap();

    let tasks = codes[1..].iter().map(|code| {
        let carts = h.state.carts.clone();
        let code = *code;
        tokio::spawn(async move { carts.add_item(user.id, sku(code), qty(1)).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(e, ShopError::CartFull(2))));
    let cart = h.state.carts.view(user.id).await.unwrap();
    assert_eq!(cart.items.len(), 2);
    assert_eq!(cart.total, Decimal::from(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_place_one_order() {
    let h = harness();
    h.product("SKU1", 20, 100).await;
    let user = h.user("a@shop.test").await;
    h.state.carts.add_item(user.id, sku("SKU1"), qty(3)).await.unwrap();

    let tasks = (0..5).map(|_| {
        let checkout = h.state.checkout.clone();
        tokio::spawn(async move { checkout.place_order(user.id).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, ShopError::CartAlreadyCheckedOut | ShopError::EmptyCart)));
    assert_eq!(h.stock_of("SKU1").await, 97);
    assert_eq!(h.state.orders.history(user.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn checkouts_of_different_carts_share_stock_safely() {
    let h = harness();
    h.product("SKU1", 20, 5).await;
    let mut users = Vec::new();
    for i in 0..4 {
        let user = h.user(&format!("u{i}@shop.test")).await;
        h.state.carts.add_item(user.id, sku("SKU1"), qty(3)).await.unwrap();
        users.push(user);
    }

    let tasks = users.iter().map(|u| {
        let checkout = h.state.checkout.clone();
        let id = u.id;
        tokio::spawn(async move { checkout.place_order(id).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(h.stock_of("SKU1").await, 2);
    for user in &users {
        let active = h.store.active_items(h.store.cart_by_user(user.id).await.unwrap().unwrap().id).await.unwrap();
        let placed = !h.state.orders.history(user.id).await.unwrap().is_empty();
        // either the items moved into an order or they are all still in the cart
        assert_eq!(active.is_empty(), placed);
    }
}
