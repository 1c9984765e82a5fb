//! Shopping basket service.
//!
//! Catalog, per-user carts, checkout and the order lifecycle over a
//! PostgreSQL (or in-memory) store.
//!
//! ## Layers
//! - [`domain`]: aggregates, value objects and events
//! - [`store`]: persistence seam with Postgres and in-memory backends
//! - [`services`]: cart, checkout, order, catalog and account operations
//! - [`http`]: axum router and handlers

use std::sync::Arc;

pub mod auth;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{ErrorKind, Result, ShopError};
pub use http::{router, AppState};

use auth::TokenIssuer;
use clock::SystemClock;
use publisher::{EventPublisher, LogPublisher, NatsPublisher};
use services::Deps;
use store::{MemoryStore, PgStore, Store};

/// Wires the store, event publisher and services described by `config`.
pub async fn build_state(config: &Config) -> anyhow::Result<AppState> {
    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let pg = PgStore::connect(url, config.database_max_connections).await?;
            pg.migrate().await?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            Arc::new(pg)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let publisher: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                Arc::new(LogPublisher)
            }
        },
        None => Arc::new(LogPublisher),
    };

    let deps = Deps { store, clock: Arc::new(SystemClock), publisher, policy: config.policy.clone() };
    let state = AppState::new(deps, TokenIssuer::new(&config.auth));
    if let Some(admin) = &config.admin {
        state.accounts.ensure_admin(&admin.email, &admin.password).await?;
    }
    Ok(state)
}
