//! Application services: the operations the HTTP layer calls, composed from
//! the domain aggregates and the store.
use std::sync::Arc;

use serde::Serialize;

use crate::clock::Clock;
use crate::config::CheckoutPolicy;
use crate::publisher::EventPublisher;
use crate::store::{PageRequest, Store};

pub mod accounts;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod orders;

pub use accounts::{AccountService, NewUser};
pub use cart::CartService;
pub use catalog::{BatchOutcome, CatalogService, NewCategory, NewProduct};
pub use checkout::CheckoutService;
pub use orders::OrderService;

/// Collaborators shared by every service.
#[derive(Clone)]
pub struct Deps {
    pub store: Arc<dyn Store>,
    pub clock: Arc<dyn Clock>,
    pub publisher: Arc<dyn EventPublisher>,
    pub policy: CheckoutPolicy,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page: u32,
    pub page_size: u32,
    pub page_count: u64,
    pub total_count: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(request: PageRequest, items: Vec<T>, total_count: u64) -> Self {
        let size = u64::from(request.page_size);
        Self { page: request.page, page_size: request.page_size, page_count: total_count.div_ceil(size), total_count, items }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { page: self.page, page_size: self.page_size, page_count: self.page_count, total_count: self.total_count, items: self.items.into_iter().map(f).collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_rounds_up() {
        let page = Page::new(PageRequest::new(Some(2), Some(10)), vec![1, 2, 3], 23);
        assert_eq!(page.page_count, 3);
        assert_eq!(Page::new(PageRequest::default(), Vec::<u8>::new(), 0).page_count, 0);
    }
}
