//! In-memory sources and row builders shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use catalogsearch_shared::{CatalogSearchError, CategoryRow, PriceRow, ProductId, Result, StoreId};

use crate::category::CategoryAggregate;
use crate::source::CatalogSource;

/// Install a test subscriber once; honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A direct or anchor membership row in store 1 with visibility 4.
pub(crate) fn category_row(
    product_id: ProductId,
    category_id: u64,
    is_parent: bool,
    position: i64,
) -> CategoryRow {
    CategoryRow {
        product_id,
        category_id,
        is_parent,
        position,
        store_name: None,
        global_name: None,
        visibility: 4,
    }
}

pub(crate) trait NamedRow {
    fn named(self, store: Option<&str>, global: Option<&str>) -> CategoryRow;
}

impl NamedRow for CategoryRow {
    fn named(mut self, store: Option<&str>, global: Option<&str>) -> CategoryRow {
        self.store_name = store.map(Into::into);
        self.global_name = global.map(Into::into);
        self
    }
}

pub(crate) fn price_row(
    product_id: ProductId,
    group: u32,
    website: u32,
    min_price: f64,
) -> PriceRow {
    PriceRow {
        product_id,
        customer_group_id: group,
        website_id: website,
        min_price,
    }
}

/// Source backed by fixed rows. Category rows are assumed to be in store 1.
#[derive(Default)]
pub(crate) struct FixtureSource {
    categories: Vec<CategoryRow>,
    prices: Vec<PriceRow>,
    aggregates: Option<Vec<CategoryAggregate>>,
    category_calls: AtomicUsize,
    price_calls: AtomicUsize,
}

impl FixtureSource {
    pub(crate) fn with_categories(mut self, rows: Vec<CategoryRow>) -> Self {
        self.categories = rows;
        self
    }

    pub(crate) fn with_prices(mut self, rows: Vec<PriceRow>) -> Self {
        self.prices = rows;
        self
    }

    /// Return these aggregates verbatim instead of grouping rows.
    pub(crate) fn with_aggregates(mut self, aggregates: Vec<CategoryAggregate>) -> Self {
        self.aggregates = Some(aggregates);
        self
    }

    pub(crate) fn category_calls(&self) -> usize {
        self.category_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogSource for FixtureSource {
    async fn category_rows(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryRow>> {
        self.category_calls.fetch_add(1, Ordering::SeqCst);
        if store_id != 1 {
            return Ok(Vec::new());
        }
        Ok(self
            .categories
            .iter()
            .filter(|row| product_ids.contains(&row.product_id))
            .cloned()
            .collect())
    }

    async fn price_rows(&self, product_ids: Option<&[ProductId]>) -> Result<Vec<PriceRow>> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .prices
            .iter()
            .filter(|row| match product_ids {
                Some(ids) if !ids.is_empty() => ids.contains(&row.product_id),
                _ => true,
            })
            .cloned()
            .collect())
    }

    async fn category_aggregates(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryAggregate>> {
        match &self.aggregates {
            Some(aggregates) => {
                self.category_calls.fetch_add(1, Ordering::SeqCst);
                Ok(aggregates.clone())
            }
            None => {
                let rows = self.category_rows(store_id, product_ids).await?;
                Ok(crate::category::aggregate_rows(rows))
            }
        }
    }
}

/// Source whose every lookup fails, as if the database were unreachable.
pub(crate) struct UnavailableSource;

#[async_trait]
impl CatalogSource for UnavailableSource {
    async fn category_rows(&self, _: StoreId, _: &[ProductId]) -> Result<Vec<CategoryRow>> {
        Err(CatalogSearchError::data_source("connection refused"))
    }

    async fn price_rows(&self, _: Option<&[ProductId]>) -> Result<Vec<PriceRow>> {
        Err(CatalogSearchError::data_source("connection refused"))
    }
}
