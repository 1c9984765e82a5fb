//! User Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ShopError;

/// Closed set of roles carried in access tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role { #[default] User, Admin }

impl Role {
    pub fn as_str(self) -> &'static str {
        match self { Self::User => "user", Self::Admin => "admin" }
    }
}

impl FromStr for Role {
    type Err = ShopError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ShopError::Internal(format!("unknown role {other}"))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub zip_code: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn register(email: &str, password_hash: String, first_name: String, last_name: String, zip_code: String, role: Role, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), email: email.trim().to_lowercase(), password_hash, first_name, last_name, zip_code, role, created_at: now }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_normalizes_email() {
        let u = User::register(" Jane@Example.COM ", "h".into(), "Jane".into(), "Doe".into(), "34000".into(), Role::User, Utc::now());
        assert_eq!(u.email, "jane@example.com");
        assert_eq!(u.role, Role::User);
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("root".parse::<Role>().is_err());
    }
}
