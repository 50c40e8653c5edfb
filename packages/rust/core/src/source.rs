//! Read-only catalog data source consumed by the fetchers.

use async_trait::async_trait;

use catalogsearch_shared::{CategoryRow, PriceRow, ProductId, Result, StoreId};
use catalogsearch_storage::Storage;

use crate::category::{CategoryAggregate, aggregate_rows};

/// Bulk lookups over the precomputed catalog indexes.
///
/// Implementations never write. Any failure of the underlying lookup is
/// reported as [`CatalogSearchError::DataSource`].
///
/// [`CatalogSearchError::DataSource`]: catalogsearch_shared::CatalogSearchError::DataSource
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Joined membership rows for `product_ids` within `store_id`.
    async fn category_rows(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryRow>>;

    /// Minimum price rows; `None` or an empty slice means every product.
    async fn price_rows(&self, product_ids: Option<&[ProductId]>) -> Result<Vec<PriceRow>>;

    /// Membership rows grouped per product.
    ///
    /// Sources that can aggregate server-side override this; the default
    /// groups [`category_rows`](Self::category_rows) locally.
    async fn category_aggregates(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryAggregate>> {
        let rows = self.category_rows(store_id, product_ids).await?;
        Ok(aggregate_rows(rows))
    }
}

#[async_trait]
impl CatalogSource for Storage {
    async fn category_rows(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryRow>> {
        Storage::category_rows(self, store_id, product_ids).await
    }

    async fn price_rows(&self, product_ids: Option<&[ProductId]>) -> Result<Vec<PriceRow>> {
        Storage::price_rows(self, product_ids).await
    }
}
