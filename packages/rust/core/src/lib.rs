//! Search index augmentation for catalog products.
//!
//! Given a batch of partially built search records, this crate bulk-loads
//! category membership and minimum price tiers for the whole batch and merges
//! them into each record under the engine's field prefix.
//!
//! - [`source::CatalogSource`]: read-only bulk lookups (implemented for
//!   [`catalogsearch_storage::Storage`])
//! - [`category`]: category data fetcher
//! - [`price`]: price tier fetcher
//! - [`augment::IndexAugmenter`]: per-batch orchestration and default filling

pub mod augment;
pub mod category;
pub mod price;
pub mod source;

#[cfg(test)]
pub(crate) mod testing;

pub use augment::{AugmentSummary, IndexAugmenter};
pub use category::{CategoryAggregate, aggregate_rows, fetch_category_data};
pub use price::{fetch_price_tiers, round_price};
pub use source::CatalogSource;
