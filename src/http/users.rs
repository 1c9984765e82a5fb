use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{AppState, JsonBody};
use crate::auth::Tokens;
use crate::error::Result;
use crate::services::NewUser;

#[derive(Debug, Deserialize)]
pub struct LoginRequest { pub email: String, pub password: String }

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest { pub refresh_token: String }

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse { pub id: uuid::Uuid, pub email: String, #[serde(flatten)] pub tokens: Tokens }

pub async fn signup(State(s): State<AppState>, JsonBody(body): JsonBody<NewUser>) -> Result<(StatusCode, Json<SignupResponse>)> {
    let (user, tokens) = s.accounts.signup(body).await?;
    Ok((StatusCode::CREATED, Json(SignupResponse { id: user.id, email: user.email, tokens })))
}

pub async fn login(State(s): State<AppState>, JsonBody(body): JsonBody<LoginRequest>) -> Result<Json<Tokens>> {
    Ok(Json(s.accounts.login(&body.email, body.password).await?))
}

pub async fn refresh(State(s): State<AppState>, JsonBody(body): JsonBody<RefreshRequest>) -> Result<Json<Value>> {
    let tokens = s.accounts.refresh(&body.refresh_token).await?;
    Ok(Json(json!({ "accessToken": tokens.access_token, "refreshToken": tokens.refresh_token })))
}
