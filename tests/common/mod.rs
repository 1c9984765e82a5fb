#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;

use shopping_basket::auth::TokenIssuer;
use shopping_basket::clock::ManualClock;
use shopping_basket::config::{AuthConfig, CheckoutPolicy};
use shopping_basket::domain::aggregates::{Cart, Product, Role, User};
use shopping_basket::domain::events::DomainEvent;
use shopping_basket::domain::value_objects::{Quantity, Sku};
use shopping_basket::publisher::EventPublisher;
use shopping_basket::services::Deps;
use shopping_basket::store::{Inventory, MemoryStore, Store};
use shopping_basket::AppState;

#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<DomainEvent> { self.events.lock().unwrap().clone() }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: DomainEvent) { self.events.lock().unwrap().push(event); }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingPublisher>,
    pub state: AppState,
}

pub fn harness() -> Harness { harness_with(CheckoutPolicy::default()) }

pub fn harness_with(policy: CheckoutPolicy) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()));
    let events = Arc::new(RecordingPublisher::default());
    let deps = Deps { store: store.clone(), clock: clock.clone(), publisher: events.clone(), policy };
    let state = AppState::new(deps, TokenIssuer::new(&AuthConfig::default()));
    Harness { store, clock, events, state }
}

pub fn sku(s: &str) -> Sku { Sku::new(s).unwrap() }

pub fn qty(n: u32) -> Quantity { Quantity::new(n).unwrap() }

impl Harness {
    pub async fn product(&self, code: &str, price: i64, stock: u32) -> Product {
        let p = Product::create(sku(code), format!("Product {code}"), Decimal::from(price), stock, None, Utc::now()).unwrap();
        self.store.insert_product(&p).await.unwrap();
        p
    }

    /// A user and their cart, inserted without going through password hashing.
    pub async fn user(&self, email: &str) -> User {
        let user = User::register(email, "unused".into(), "Test".into(), "User".into(), "10001".into(), Role::User, Utc::now());
        self.store.insert_user_with_cart(&user, &Cart::new(user.id)).await.unwrap();
        user
    }

    pub async fn stock_of(&self, code: &str) -> u32 {
        self.store.product_by_sku(&sku(code)).await.unwrap().unwrap().stock
    }

    pub async fn stored_total(&self, user: &User) -> Decimal {
        self.store.cart_by_user(user.id).await.unwrap().unwrap().total
    }
}
