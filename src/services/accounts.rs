//! Signup, login and token refresh.
use std::sync::Arc;

use serde::Deserialize;
use validator::Validate;

use super::Deps;
use crate::auth::{hash_password, verify_password, TokenIssuer, Tokens};
use crate::domain::aggregates::{Cart, Role, User};
use crate::error::{Result, ShopError};
use crate::store::StoreError;

#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 100))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100))]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    pub zip_code: String,
}

#[derive(Clone)]
pub struct AccountService {
    deps: Deps,
    tokens: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(deps: Deps, tokens: Arc<TokenIssuer>) -> Self { Self { deps, tokens } }

    /// Public signup always yields a plain user.
    pub async fn signup(&self, input: NewUser) -> Result<(User, Tokens)> {
        let user = self.register(input, Role::User).await?;
        let tokens = self.tokens.issue(&user, self.deps.clock.now())?;
        Ok((user, tokens))
    }

    /// Creates the user and their empty cart together.
    #[tracing::instrument(skip_all, fields(email = %input.email, role = role.as_str()))]
    pub async fn register(&self, input: NewUser, role: Role) -> Result<User> {
        input.validate()?;
        let hash = hash_password(input.password).await?;
        let user = User::register(&input.email, hash, input.first_name, input.last_name, input.zip_code, role, self.deps.clock.now());
        let cart = Cart::new(user.id);
        let inserted = self.deps.store.insert_user_with_cart(&user, &cart).await;
        match inserted {
            Ok(()) => {
                tracing::info!(user_id = %user.id, "user registered");
                Ok(user)
            }
            Err(StoreError::UniqueViolation(_)) => Err(ShopError::DuplicateEmail(user.email)),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates the administrator unless an account with that e-mail already exists.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<()> {
        if self.deps.store.user_by_email(&email.trim().to_lowercase()).await?.is_some() {
            return Ok(());
        }
        let input = NewUser {
            email: email.to_string(),
            password: password.to_string(),
            first_name: "Admin".into(),
            last_name: "Admin".into(),
            zip_code: "00000".into(),
        };
        self.register(input, Role::Admin).await.map(|_| ())
    }

    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: String) -> Result<Tokens> {
        let email = email.trim().to_lowercase();
        let user = self.deps.store.user_by_email(&email).await?.ok_or(ShopError::InvalidCredentials)?;
        if !verify_password(password, user.password_hash.clone()).await? {
            return Err(ShopError::InvalidCredentials);
        }
        self.tokens.issue(&user, self.deps.clock.now())
    }

    /// Exchanges a refresh token for a fresh pair. The role is re-read from the store.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let claims = self.tokens.verify_refresh(refresh_token)?;
        let user = self.deps.store.user_by_id(claims.sub).await?.ok_or(ShopError::Unauthorized)?;
        self.tokens.issue(&user, self.deps.clock.now())
    }
}
