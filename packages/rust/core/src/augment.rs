//! Index augmenter: enriches a batch of search records with category and
//! price fields.
//!
//! Both lookups run once per batch. A record gets the derived fields only when
//! its product has category data *and* price data; otherwise it gets the
//! default triple (`categories`, `show_in_categories`, `visibility`) and no
//! position or price fields. Existing fields are never overwritten.

use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, info, instrument};

use catalogsearch_shared::{
    Batch, CategoryMembership, FieldKeys, IndexSettings, PriceTier, ProductId, Record, Result,
    StoreId,
};

use crate::category::fetch_category_data;
use crate::price::fetch_price_tiers;
use crate::source::CatalogSource;

/// Outcome of one augmentation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AugmentSummary {
    /// Records in the batch.
    pub records: usize,
    /// Records that received category and price fields.
    pub enriched: usize,
    /// Records that only received the defaults.
    pub defaulted: usize,
    /// Wall time of the pass, lookups included.
    pub elapsed: Duration,
}

/// Adds category and price fields to search records.
pub struct IndexAugmenter<S> {
    source: S,
    settings: IndexSettings,
}

impl<S: CatalogSource> IndexAugmenter<S> {
    pub fn new(source: S, settings: IndexSettings) -> Self {
        Self { source, settings }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn settings(&self) -> &IndexSettings {
        &self.settings
    }

    /// Augment `records` and hand the batch back.
    ///
    /// `product_ids` defaults to every product id in the batch. Ids without a
    /// record are ignored.
    pub async fn augment(
        &self,
        mut records: Batch,
        store_id: StoreId,
        product_ids: Option<&[ProductId]>,
    ) -> Result<Batch> {
        self.augment_in_place(&mut records, store_id, product_ids)
            .await?;
        Ok(records)
    }

    /// Augment `records` in place.
    ///
    /// Lookup failures abort the call before any record is touched.
    #[instrument(skip_all, fields(store_id = store_id, records = records.len()))]
    pub async fn augment_in_place(
        &self,
        records: &mut Batch,
        store_id: StoreId,
        product_ids: Option<&[ProductId]>,
    ) -> Result<AugmentSummary> {
        let start = Instant::now();

        if records.is_empty() {
            debug!("empty batch, nothing to augment");
            return Ok(AugmentSummary {
                elapsed: start.elapsed(),
                ..AugmentSummary::default()
            });
        }

        let derived: Vec<ProductId>;
        let product_ids = match product_ids {
            Some(ids) => ids,
            None => {
                derived = records.keys().copied().collect();
                &derived
            }
        };

        let source: &dyn CatalogSource = &self.source;
        let (categories, prices) = tokio::try_join!(
            fetch_category_data(source, store_id, product_ids, true),
            fetch_price_tiers(source, Some(product_ids), self.settings.price_precision),
        )?;

        let keys = &self.settings.fields;
        let mut summary = AugmentSummary {
            records: records.len(),
            ..AugmentSummary::default()
        };

        for (product_id, record) in records.iter_mut() {
            match (categories.get(product_id), prices.get(product_id)) {
                (Some(membership), Some(tier)) => {
                    merge_absent(record, membership_fields(keys, membership));
                    merge_absent(record, price_fields(keys, tier));
                    summary.enriched += 1;
                }
                _ => {
                    merge_absent(record, default_fields(keys));
                    summary.defaulted += 1;
                }
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            enriched = summary.enriched,
            defaulted = summary.defaulted,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "batch augmented"
        );
        Ok(summary)
    }
}

/// Insert each field unless the record already has it.
fn merge_absent(record: &mut Record, fields: Vec<(String, Value)>) {
    for (key, value) in fields {
        record.entry(key).or_insert(value);
    }
}

/// Category-derived fields of one product.
pub fn membership_fields(
    keys: &FieldKeys,
    membership: &CategoryMembership,
) -> Vec<(String, Value)> {
    let mut fields = vec![
        (keys.categories(), json!(membership.parent_category_ids)),
        (keys.category_names(), json!(membership.category_names)),
        (keys.show_in_categories(), json!(membership.anchor_category_ids)),
    ];
    fields.extend(membership.positions.iter().map(|(&category_id, &position)| {
        (keys.position_category(category_id), json!(position))
    }));
    if let Some(visibility) = membership.visibility {
        fields.push((keys.visibility(), json!(visibility)));
    }
    fields
}

/// Price-derived fields of one product.
pub fn price_fields(keys: &FieldKeys, tier: &PriceTier) -> Vec<(String, Value)> {
    tier.iter()
        .map(|(&scope, &price)| (keys.price(scope), json!(price)))
        .collect()
}

/// Fields written when category or price data is missing.
pub fn default_fields(keys: &FieldKeys) -> Vec<(String, Value)> {
    vec![
        (keys.categories(), json!([])),
        (keys.show_in_categories(), json!([])),
        (keys.visibility(), json!(0)),
    ]
}
