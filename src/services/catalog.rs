//! Products and categories, including bulk creation with per-row outcomes.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{Deps, Page};
use crate::domain::aggregates::{Category, Product, ProductPatch};
use crate::domain::value_objects::Sku;
use crate::error::{Result, ShopError};
use crate::store::{PageRequest, StoreError};

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub price: Decimal,
    pub stock: u32,
    pub category: Option<String>,
}

/// Result of one row of a bulk request. Rows are numbered from 1.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum BatchOutcome<T> {
    Created { row: usize, item: T },
    Failed { row: usize, error: String },
}

impl<T> BatchOutcome<T> {
    fn from_result(row: usize, result: Result<T>) -> Self {
        match result {
            Ok(item) => Self::Created { row, item },
            Err(e) => Self::Failed { row, error: e.to_string() },
        }
    }

    pub fn is_created(&self) -> bool { matches!(self, Self::Created { .. }) }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> BatchOutcome<U> {
        match self {
            Self::Created { row, item } => BatchOutcome::Created { row, item: f(item) },
            Self::Failed { row, error } => BatchOutcome::Failed { row, error },
        }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    deps: Deps,
}

impl CatalogService {
    pub fn new(deps: Deps) -> Self { Self { deps } }

    #[tracing::instrument(skip(self))]
    pub async fn create_category(&self, input: NewCategory) -> Result<Category> {
        input.validate()?;
        let category = Category::create(input.name, input.description, self.deps.clock.now())?;
        let inserted = self.deps.store.insert_category(&category).await;
        match inserted {
            Ok(()) => Ok(category),
            Err(StoreError::UniqueViolation(_)) => Err(ShopError::DuplicateCategory(category.name)),
            Err(e) => Err(e.into()),
        }
    }

    /// Each row is attempted once; a failed row never stops the rest.
    #[tracing::instrument(skip_all, fields(rows = inputs.len()))]
    pub async fn create_categories(&self, inputs: Vec<NewCategory>) -> Vec<BatchOutcome<Category>> {
        let mut outcomes = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            outcomes.push(BatchOutcome::from_result(i + 1, self.create_category(input).await));
        }
        let created = outcomes.iter().filter(|o| o.is_created()).count();
        tracing::info!(created, failed = outcomes.len() - created, "category batch processed");
        outcomes
    }

    pub async fn list_categories(&self, page: PageRequest) -> Result<Page<Category>> {
        let (items, total) = self.deps.store.list_categories(page).await?;
        Ok(Page::new(page, items, total))
    }

    #[tracing::instrument(skip(self))]
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        input.validate()?;
        let sku = Sku::new(input.sku)?;
        if let Some(category) = &input.category {
            if self.deps.store.category_by_name(category).await?.is_none() {
                return Err(ShopError::CategoryNotFound(category.clone()));
            }
        }
        let product = Product::create(sku, input.name, input.price, input.stock, input.category, self.deps.clock.now())?;
        let inserted = self.deps.store.insert_product(&product).await;
        match inserted {
            Ok(()) => Ok(product),
            Err(StoreError::UniqueViolation(_)) => Err(ShopError::DuplicateSku(product.sku)),
            Err(e) => Err(e.into()),
        }
    }

    #[tracing::instrument(skip_all, fields(rows = inputs.len()))]
    pub async fn create_products(&self, inputs: Vec<NewProduct>) -> Vec<BatchOutcome<Product>> {
        let mut outcomes = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            outcomes.push(BatchOutcome::from_result(i + 1, self.create_product(input).await));
        }
        let created = outcomes.iter().filter(|o| o.is_created()).count();
        tracing::info!(created, failed = outcomes.len() - created, "product batch processed");
        outcomes
    }

    pub async fn list_products(&self, page: PageRequest) -> Result<Page<Product>> {
        let (items, total) = self.deps.store.list_products(page).await?;
        Ok(Page::new(page, items, total))
    }

    pub async fn search_products(&self, name: &str) -> Result<Vec<Product>> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ShopError::Invalid("search term must not be empty".into()));
        }
        Ok(self.deps.store.search_products(name).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_product(&self, sku: Sku, patch: ProductPatch) -> Result<Product> {
        let patch = patch.validated()?;
        if let Some(category) = &patch.category {
            if self.deps.store.category_by_name(category).await?.is_none() {
                return Err(ShopError::CategoryNotFound(category.clone()));
            }
        }
        let updated = self.deps.store.update_product(&sku, &patch).await?;
        updated.ok_or(ShopError::ProductNotFound(sku))
    }

    /// Products still referenced by a cart item or an order cannot be deleted.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, sku: Sku) -> Result<()> {
        let deleted = self.deps.store.delete_product(&sku).await;
        match deleted {
            Ok(true) => Ok(()),
            Ok(false) => Err(ShopError::ProductNotFound(sku)),
            Err(StoreError::ForeignKeyViolation(_)) => Err(ShopError::ProductInUse(sku)),
            Err(e) => Err(e.into()),
        }
    }
}
