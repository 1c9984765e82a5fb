//! Behaviour every store backend must share. The Postgres run needs `DATABASE_URL`
//! and is skipped without it.
mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use common::qty;
use shopping_basket::domain::aggregates::{Cart, Item, Order, OrderStatus, Product, ProductPatch, Role, User};
use shopping_basket::domain::value_objects::Sku;
use shopping_basket::store::{MemoryStore, PgStore, Store, StoreError};

fn tag() -> String { Uuid::new_v4().simple().to_string()[..8].to_uppercase() }

async fn contract(store: Arc<dyn Store>) {
    let now = Utc::now();
    let suffix = tag();
    let sku = Sku::new(format!("C{suffix}")).unwrap();
    let product = Product::create(sku.clone(), format!("Contract {suffix}"), Decimal::new(1250, 2), 4, None, now).unwrap();
    store.insert_product(&product).await.unwrap();
    assert!(matches!(store.insert_product(&product).await, Err(StoreError::UniqueViolation(_))));

    let user = User::register(&format!("{suffix}@contract.test"), "hash".into(), "C".into(), "T".into(), "1".into(), Role::User, now);
    let cart = Cart::new(user.id);
    store.insert_user_with_cart(&user, &cart).await.unwrap();
    assert!(matches!(store.insert_user_with_cart(&user, &Cart::new(user.id)).await, Err(StoreError::UniqueViolation(_))));
    assert_eq!(store.user_by_email(&user.email).await.unwrap().unwrap().id, user.id);
    assert_eq!(store.cart_by_user(user.id).await.unwrap().unwrap().id, cart.id);

    // one active item per product
    let item = Item::new(cart.id, product.clone(), qty(2), now).unwrap();
    store.insert_item(&item, 20).await.unwrap();
    let twin = Item::new(cart.id, product.clone(), qty(1), now).unwrap();
    assert!(matches!(store.insert_item(&twin, 20).await, Err(StoreError::UniqueViolation(_))));
    // the cap wins over the duplicate rule and is checked against stored rows
    assert!(matches!(store.insert_item(&twin, 1).await, Err(StoreError::CartFull(1))));

    assert!(store.update_item(cart.id, product.id, qty(3), Decimal::new(3750, 2)).await.unwrap());
    let active = store.active_items(cart.id).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].line_total, Decimal::new(3750, 2));
    assert_eq!(active[0].product.sku, sku);

    // stock never goes below zero
    assert!(!store.decrement_stock(&sku, qty(5)).await.unwrap());
    assert!(store.decrement_stock(&sku, qty(4)).await.unwrap());
    assert!(!store.decrement_stock(&sku, qty(1)).await.unwrap());
    assert!(store.increment_stock(product.id, qty(4)).await.unwrap());

    // a dropped transaction leaves no trace
    let order = Order::place(user.id, Decimal::new(3750, 2), now - Duration::minutes(1));
    {
        let tx = store.begin().await.unwrap();
        tx.insert_order(&order).await.unwrap();
        assert!(tx.decrement_stock(&sku, qty(3)).await.unwrap());
        assert_eq!(tx.claim_items(order.id, &[item.id]).await.unwrap(), 1);
    }
    assert!(store.order_by_id(order.id).await.unwrap().is_none());
    assert_eq!(store.product_by_sku(&sku).await.unwrap().unwrap().stock, 4);
    assert_eq!(store.active_items(cart.id).await.unwrap().len(), 1);

    // a committed one is visible, and claimed items leave the cart
    let tx = store.begin().await.unwrap();
    tx.insert_order(&order).await.unwrap();
    assert_eq!(tx.claim_items(order.id, &[item.id]).await.unwrap(), 1);
    assert_eq!(tx.claim_items(order.id, &[item.id]).await.unwrap(), 0);
    tx.set_cart_total(cart.id, Decimal::ZERO).await.unwrap();
    tx.commit().await.unwrap();

    assert!(store.active_items(cart.id).await.unwrap().is_empty());
    let stored = store.order_by_id(order.id).await.unwrap().unwrap();
    assert_eq!(stored.items.len(), 1);
    assert!(stored.items[0].ordered);
    assert!(!store.update_item(cart.id, product.id, qty(1), Decimal::ONE).await.unwrap());
    assert!(!store.delete_item(cart.id, product.id).await.unwrap());

    // ordered rows still reference the product
    assert!(matches!(store.delete_product(&sku).await, Err(StoreError::ForeignKeyViolation(_))));

    let tx = store.begin().await.unwrap();
    assert!(tx.cancel_order(order.id).await.unwrap());
    assert!(!tx.cancel_order(order.id).await.unwrap());
    tx.commit().await.unwrap();
    let history = store.orders_by_user(user.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].status, OrderStatus::Canceled);

    let patched = store.update_product(&sku, &ProductPatch { stock: Some(9), ..Default::default() }).await.unwrap().unwrap();
    assert_eq!(patched.stock, 9);
    assert_eq!(patched.name, product.name);
    assert!(store.update_product(&Sku::new(format!("N{suffix}")).unwrap(), &ProductPatch::default()).await.unwrap().is_none());
    assert!(store.search_products(&suffix.to_lowercase()).await.unwrap().iter().any(|p| p.id == product.id));
}

#[tokio::test]
async fn memory_store_honours_contract() {
    contract(Arc::new(MemoryStore::new())).await;
}

#[tokio::test]
async fn postgres_store_honours_contract() {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return;
    };
    let store = PgStore::connect(&url, 5).await.unwrap();
    store.migrate().await.unwrap();
    contract(Arc::new(store)).await;
}
