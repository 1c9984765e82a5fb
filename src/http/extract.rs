//! Request extractors that reject with the service's JSON error shape.
use axum::extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request};
use axum::http::{header::AUTHORIZATION, request::Parts};
use axum::Json;
use uuid::Uuid;

use super::AppState;
use crate::domain::aggregates::Role;
use crate::error::ShopError;

/// Caller identity taken from `Authorization: Bearer <access token>`.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()).ok_or(ShopError::Unauthorized)?;
        let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
        let claims = state.tokens.verify_access(token)?;
        Ok(Self { id: claims.sub, email: claims.email, role: claims.role })
    }
}

/// An [`AuthUser`] whose token carries the admin role.
#[derive(Clone, Debug)]
pub struct AdminUser(pub AuthUser);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        match user.role {
            Role::Admin => Ok(Self(user)),
            Role::User => Err(ShopError::Forbidden),
        }
    }
}

/// `Json<T>` whose rejection is a 400 with the usual `{"error": ...}` body.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await.map_err(|e| ShopError::Invalid(e.body_text()))?;
        Ok(Self(value))
    }
}
