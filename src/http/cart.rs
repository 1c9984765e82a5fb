use axum::{extract::{Path, State}, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AppState, AuthUser, CartView, JsonBody};
use crate::domain::value_objects::{Quantity, Sku};
use crate::error::Result;

#[derive(Debug, Deserialize)]
pub struct AddItemRequest { pub sku: Sku, pub quantity: Quantity }

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest { pub quantity: Quantity }

pub async fn view(user: AuthUser, State(s): State<AppState>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.view(user.id).await?.into()))
}

pub async fn add_item(user: AuthUser, State(s): State<AppState>, JsonBody(body): JsonBody<AddItemRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.add_item(user.id, body.sku, body.quantity).await?.into()))
}

pub async fn update_item(user: AuthUser, State(s): State<AppState>, Path(sku): Path<String>, JsonBody(body): JsonBody<UpdateItemRequest>) -> Result<Json<CartView>> {
    Ok(Json(s.carts.update_item(user.id, Sku::new(sku)?, body.quantity).await?.into()))
}

pub async fn remove_item(user: AuthUser, State(s): State<AppState>, Path(sku): Path<String>) -> Result<Json<Value>> {
    let sku = Sku::new(sku)?;
    let cart = s.carts.remove_item(user.id, sku.clone()).await?;
    Ok(Json(json!({ "message": format!("Product with SKU {sku} removed from the cart"), "total": cart.total })))
}
