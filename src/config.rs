//! Runtime configuration, read from the environment (and `.env` via dotenvy).
use std::env;
use std::str::FromStr;

use chrono::Duration;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Business rules applied by the cart, checkout and order services.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckoutPolicy {
    pub min_order_total: Decimal,
    pub max_cart_items: usize,
    pub cancel_window: Duration,
    /// Return the ordered quantities to stock when an order is canceled.
    pub restock_on_cancel: bool,
}

impl CheckoutPolicy {
    /// Upper bound for `MAX_CART_ITEMS`; keeps the largest cart total inside `NUMERIC(14, 2)`.
    pub const CART_ITEMS_CEILING: usize = 100;
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self { min_order_total: Decimal::from(50), max_cart_items: 20, cancel_window: Duration::days(14), restock_on_cancel: false }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AuthConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            access_secret: "dev-access-secret".into(),
            refresh_secret: "dev-refresh-secret".into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::hours(168),
        }
    }
}

/// Administrator account created at startup when it does not exist yet.
#[derive(Clone, Debug, PartialEq)]
pub struct AdminSeed {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub port: u16,
    pub route_prefix: String,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub nats_url: Option<String>,
    pub auth: AuthConfig,
    pub policy: CheckoutPolicy,
    pub admin: Option<AdminSeed>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let database_url = get("DATABASE_URL");

        let defaults = AuthConfig::default();
        let secret = |key: &'static str, fallback: String| match (get(key), &database_url) {
            (Some(v), _) => Ok(v),
            (None, None) => Ok(fallback),
            (None, Some(_)) => Err(ConfigError::Missing(key)),
        };
        let auth = AuthConfig {
            access_secret: secret("JWT_SECRET", defaults.access_secret)?,
            refresh_secret: secret("JWT_REFRESH_SECRET", defaults.refresh_secret)?,
            access_ttl: Duration::minutes(parse(&get, "ACCESS_TOKEN_MINUTES", 15)?),
            refresh_ttl: Duration::hours(parse(&get, "REFRESH_TOKEN_HOURS", 168)?),
        };

        let mut route_prefix = get("ROUTE_PREFIX").unwrap_or_else(|| "/api/v1".into());
        if !route_prefix.starts_with('/') { route_prefix.insert(0, '/'); }
        let route_prefix = route_prefix.trim_end_matches('/').to_string();

        let policy = CheckoutPolicy {
            min_order_total: parse(&get, "MIN_ORDER_TOTAL", Decimal::from(50))?,
            max_cart_items: parse(&get, "MAX_CART_ITEMS", 20)?,
            cancel_window: Duration::days(parse(&get, "CANCEL_WINDOW_DAYS", 14)?),
            restock_on_cancel: parse(&get, "RESTOCK_ON_CANCEL", false)?,
        };
        if policy.min_order_total.is_sign_negative() {
            return Err(ConfigError::Invalid { key: "MIN_ORDER_TOTAL", value: policy.min_order_total.to_string() });
        }
        if policy.max_cart_items == 0 || policy.max_cart_items > CheckoutPolicy::CART_ITEMS_CEILING {
            return Err(ConfigError::Invalid { key: "MAX_CART_ITEMS", value: policy.max_cart_items.to_string() });
        }

        let admin = match (get("ADMIN_EMAIL"), get("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed { email, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            port: parse(&get, "PORT", 8083)?,
            route_prefix,
            database_url,
            database_max_connections: parse(&get, "DATABASE_MAX_CONNECTIONS", 10)?,
            nats_url: get("NATS_URL"),
            auth,
            policy,
            admin,
        })
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError> {
    match get(key) {
        None => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from(&[]).unwrap();
        assert_eq!(config.port, 8083);
        assert_eq!(config.route_prefix, "/api/v1");
        assert!(config.database_url.is_none());
        assert_eq!(config.policy, CheckoutPolicy::default());
        assert_eq!(config.auth.access_ttl, Duration::minutes(15));
        assert!(config.admin.is_none());
    }

    #[test]
    fn test_admin_seed_needs_both_halves() {
        assert_eq!(from(&[("ADMIN_EMAIL", "root@shop.test")]).unwrap_err(), ConfigError::Missing("ADMIN_PASSWORD"));
        let config = from(&[("ADMIN_EMAIL", "root@shop.test"), ("ADMIN_PASSWORD", "changeme123")]).unwrap();
        assert_eq!(config.admin.unwrap().email, "root@shop.test");
    }

    #[test]
    fn test_overrides() {
        let config = from(&[("MIN_ORDER_TOTAL", "10.50"), ("CANCEL_WINDOW_DAYS", "7"), ("RESTOCK_ON_CANCEL", "true"), ("ROUTE_PREFIX", "shop/")]).unwrap();
        assert_eq!(config.policy.min_order_total, Decimal::new(1050, 2));
        assert_eq!(config.policy.cancel_window, Duration::days(7));
        assert!(config.policy.restock_on_cancel);
        assert_eq!(config.route_prefix, "/shop");
    }

    #[test]
    fn test_database_requires_secrets() {
        assert_eq!(from(&[("DATABASE_URL", "postgres://localhost/basket")]).unwrap_err(), ConfigError::Missing("JWT_SECRET"));
        let config = from(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "a"), ("JWT_REFRESH_SECRET", "b")]).unwrap();
        assert_eq!(config.auth.access_secret, "a");
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(from(&[("PORT", "eighty")]), Err(ConfigError::Invalid { key: "PORT", .. })));
        assert!(matches!(from(&[("MAX_CART_ITEMS", "0")]), Err(ConfigError::Invalid { key: "MAX_CART_ITEMS", .. })));
        assert!(matches!(from(&[("MAX_CART_ITEMS", "101")]), Err(ConfigError::Invalid { key: "MAX_CART_ITEMS", .. })));
    }
}
