//! Access/refresh tokens (HS256 JWT) and argon2 password hashing.
use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::domain::aggregates::{Role, User};
use crate::error::{Result, ShopError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
struct Keys { encoding: EncodingKey, decoding: DecodingKey }

impl Keys {
    fn new(secret: &str) -> Self {
        Self { encoding: EncodingKey::from_secret(secret.as_bytes()), decoding: DecodingKey::from_secret(secret.as_bytes()) }
    }
}

/// Signs and verifies both token kinds. Access and refresh tokens use separate keys,
/// so one can never stand in for the other.
#[derive(Clone)]
pub struct TokenIssuer {
    access: Keys,
    refresh: Keys,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: Keys::new(&config.access_secret),
            refresh: Keys::new(&config.refresh_secret),
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
        }
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<Tokens> {
        Ok(Tokens {
            access_token: sign(&self.access, user, now, self.access_ttl)?,
            refresh_token: sign(&self.refresh, user, now, self.refresh_ttl)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Claims> { verify(&self.access, token) }

    pub fn verify_refresh(&self, token: &str) -> Result<Claims> { verify(&self.refresh, token) }
}

fn sign(keys: &Keys, user: &User, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
    let claims = Claims { sub: user.id, email: user.email.clone(), role: user.role, iat: now.timestamp(), exp: (now + ttl).timestamp() };
    encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding).map_err(|e| ShopError::Internal(format!("token signing failed: {e}")))
}

fn verify(keys: &Keys, token: &str) -> Result<Claims> {
    decode::<Claims>(token, &keys.decoding, &Validation::new(Algorithm::HS256))
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "token rejected");
            ShopError::Unauthorized
        })
}

/// Hashes on the blocking pool; argon2 is deliberately slow.
pub async fn hash_password(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default().hash_password(password.as_bytes(), &salt).map(|hash| hash.to_string())
    })
    .await
    .map_err(|e| ShopError::Internal(e.to_string()))?
    .map_err(|e| ShopError::Internal(format!("password hashing failed: {e}")))
}

pub async fn verify_password(password: String, hash: String) -> Result<bool> {
    tokio::task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash).map_err(|e| ShopError::Internal(format!("stored password hash is invalid: {e}")))?;
        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
    })
    .await
    .map_err(|e| ShopError::Internal(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User::register("jane@example.com", String::new(), "Jane".into(), "Doe".into(), "34000".into(), role, Utc::now())
    }

    #[test]
    fn test_tokens_round_trip_with_role() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let admin = user(Role::Admin);
        let tokens = issuer.issue(&admin, Utc::now()).unwrap();
        let claims = issuer.verify_access(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(issuer.verify_refresh(&tokens.refresh_token).unwrap().sub, admin.id);
    }

    #[test]
    fn test_keys_are_not_interchangeable() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let tokens = issuer.issue(&user(Role::User), Utc::now()).unwrap();
        assert!(matches!(issuer.verify_access(&tokens.refresh_token), Err(ShopError::Unauthorized)));
        assert!(matches!(issuer.verify_refresh(&tokens.access_token), Err(ShopError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let issuer = TokenIssuer::new(&AuthConfig::default());
        let tokens = issuer.issue(&user(Role::User), Utc::now() - Duration::hours(2)).unwrap();
        assert!(issuer.verify_access(&tokens.access_token).is_err());
    }

    #[tokio::test]
    async fn test_password_hash_verifies() {
        let hash = hash_password("s3cret-pass".into()).await.unwrap();
        assert!(verify_password("s3cret-pass".into(), hash.clone()).await.unwrap());
        assert!(!verify_password("wrong".into(), hash).await.unwrap());
    }
}
