use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use rust_decimal::Decimal;
use serde::Deserialize;

use super::{AdminUser, AppState, JsonBody, ProductView};
use crate::domain::aggregates::{Category, ProductPatch};
use crate::domain::value_objects::Sku;
use crate::error::Result;
use crate::services::{BatchOutcome, NewCategory, NewProduct, Page};
use crate::store::PageRequest;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery { pub page: Option<u32>, pub page_size: Option<u32> }

impl From<PageQuery> for PageRequest {
    fn from(q: PageQuery) -> Self { PageRequest::new(q.page, q.page_size) }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery { pub name: String }

#[derive(Debug, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<u32>,
    pub category: Option<String>,
}

pub async fn list_products(State(s): State<AppState>, Query(q): Query<PageQuery>) -> Result<Json<Page<ProductView>>> {
    Ok(Json(s.catalog.list_products(q.into()).await?.map(ProductView::public)))
}

pub async fn search_products(State(s): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Vec<ProductView>>> {
    Ok(Json(s.catalog.search_products(&q.name).await?.into_iter().map(ProductView::public).collect()))
}

pub async fn create_product(_: AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<NewProduct>) -> Result<(StatusCode, Json<ProductView>)> {
    Ok((StatusCode::CREATED, Json(ProductView::admin(s.catalog.create_product(body).await?))))
}

pub async fn create_products(_: AdminUser, State(s): State<AppState>, JsonBody(rows): JsonBody<Vec<NewProduct>>) -> Json<Vec<BatchOutcome<ProductView>>> {
    Json(s.catalog.create_products(rows).await.into_iter().map(|o| o.map(ProductView::admin)).collect())
}

pub async fn update_product(_: AdminUser, State(s): State<AppState>, Path(sku): Path<String>, JsonBody(body): JsonBody<ProductUpdate>) -> Result<Json<ProductView>> {
    let patch = ProductPatch { name: body.name, price: body.price, stock: body.stock, category: body.category };
    Ok(Json(ProductView::admin(s.catalog.update_product(Sku::new(sku)?, patch).await?)))
}

pub async fn delete_product(_: AdminUser, State(s): State<AppState>, Path(sku): Path<String>) -> Result<StatusCode> {
    s.catalog.delete_product(Sku::new(sku)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_categories(State(s): State<AppState>, Query(q): Query<PageQuery>) -> Result<Json<Page<Category>>> {
    Ok(Json(s.catalog.list_categories(q.into()).await?))
}

pub async fn create_category(_: AdminUser, State(s): State<AppState>, JsonBody(body): JsonBody<NewCategory>) -> Result<(StatusCode, Json<Category>)> {
    Ok((StatusCode::CREATED, Json(s.catalog.create_category(body).await?)))
}

pub async fn create_categories(_: AdminUser, State(s): State<AppState>, JsonBody(rows): JsonBody<Vec<NewCategory>>) -> Json<Vec<BatchOutcome<Category>>> {
    Json(s.catalog.create_categories(rows).await)
}
