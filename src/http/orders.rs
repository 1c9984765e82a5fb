use axum::{extract::{Path, State}, http::StatusCode, Json};
use uuid::Uuid;

use super::{AppState, AuthUser, OrderView};
use crate::error::Result;

pub async fn place(user: AuthUser, State(s): State<AppState>) -> Result<(StatusCode, Json<OrderView>)> {
    Ok((StatusCode::CREATED, Json(s.checkout.place_order(user.id).await?.into())))
}

pub async fn history(user: AuthUser, State(s): State<AppState>) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(s.orders.history(user.id).await?.into_iter().map(OrderView::from).collect()))
}

pub async fn cancel(user: AuthUser, State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    Ok(Json(s.orders.cancel(user.id, id).await?.into()))
}
