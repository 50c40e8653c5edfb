//! Category data fetcher.
//!
//! Loads the category membership of a batch of products within one store and
//! folds the joined rows into one [`CategoryMembership`] per product:
//!
//! 1. Rows are grouped by product id. The sort is stable, so rows of one
//!    product keep the order the source returned them in.
//! 2. Direct-parent rows feed `parent_category_ids` and the category names,
//!    anchor rows feed `anchor_category_ids`.
//! 3. Every row contributes a `categoryId_position` token; the tokens are
//!    parsed back into the `positions` map.
//!
//! Products without any row are simply absent from the result.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use catalogsearch_shared::{
    CatalogSearchError, CategoryId, CategoryMembership, CategoryRow, ProductId, Result, StoreId,
};

use crate::source::CatalogSource;

/// Separator between category id and position inside a position token.
const POSITION_SEPARATOR: char = '_';

/// All membership rows of one product, grouped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAggregate {
    pub product_id: ProductId,
    /// Direct-parent category ids, in row order.
    pub parents: Vec<CategoryId>,
    /// Anchor category ids, in row order.
    pub anchors: Vec<CategoryId>,
    /// Space-joined `categoryId_position` tokens, one per row.
    pub positions: String,
    /// Resolved parent names in row order. May contain empty strings.
    pub names: Vec<String>,
    /// Visibility of the product in the store.
    pub visibility: i64,
}

impl CategoryAggregate {
    fn new(product_id: ProductId, visibility: i64) -> Self {
        Self {
            product_id,
            parents: Vec::new(),
            anchors: Vec::new(),
            positions: String::new(),
            names: Vec::new(),
            visibility,
        }
    }

    fn absorb(&mut self, row: &CategoryRow) {
        if row.is_parent {
            self.parents.push(row.category_id);
            if let Some(name) = row.resolved_name() {
                self.names.push(name.to_owned());
            }
        } else {
            self.anchors.push(row.category_id);
        }

        if !self.positions.is_empty() {
            self.positions.push(' ');
        }
        self.positions.push_str(&format!(
            "{}{POSITION_SEPARATOR}{}",
            row.category_id, row.position
        ));
    }

    /// Decode the aggregate into a [`CategoryMembership`].
    ///
    /// Empty names are dropped. A position token without a separator, or
    /// with a non-numeric part, fails with
    /// [`CatalogSearchError::MalformedAggregate`].
    pub fn into_membership(self, include_visibility: bool) -> Result<CategoryMembership> {
        let product_id = self.product_id;
        let mut positions = BTreeMap::new();

        for token in self.positions.split_whitespace() {
            let (category, position) = token.split_once(POSITION_SEPARATOR).ok_or_else(|| {
                CatalogSearchError::malformed_aggregate(
                    product_id,
                    format!("position token `{token}` has no separator"),
                )
            })?;
            let category_id: CategoryId = category.parse().map_err(|e| {
                CatalogSearchError::malformed_aggregate(
                    product_id,
                    format!("invalid category id in `{token}`: {e}"),
                )
            })?;
            let position: i64 = position.parse().map_err(|e| {
                CatalogSearchError::malformed_aggregate(
                    product_id,
                    format!("invalid position in `{token}`: {e}"),
                )
            })?;
            positions.insert(category_id, position);
        }

        Ok(CategoryMembership {
            parent_category_ids: self.parents,
            anchor_category_ids: self.anchors,
            category_names: self.names.into_iter().filter(|n| !n.is_empty()).collect(),
            positions,
            visibility: include_visibility.then_some(self.visibility),
        })
    }
}

/// Group joined rows into one aggregate per product, ordered by product id.
pub fn aggregate_rows(mut rows: Vec<CategoryRow>) -> Vec<CategoryAggregate> {
    rows.sort_by_key(|row| row.product_id);

    let mut aggregates: Vec<CategoryAggregate> = Vec::new();
    for row in &rows {
        let starts_group = aggregates
            .last()
            .is_none_or(|current| current.product_id != row.product_id);
        if starts_group {
            aggregates.push(CategoryAggregate::new(row.product_id, row.visibility));
        }
        if let Some(current) = aggregates.last_mut() {
            current.absorb(row);
        }
    }
    aggregates
}

/// Fetch the category membership of `product_ids` within `store_id`.
#[instrument(skip_all, fields(store_id = store_id, products = product_ids.len()))]
pub async fn fetch_category_data(
    source: &dyn CatalogSource,
    store_id: StoreId,
    product_ids: &[ProductId],
    include_visibility: bool,
) -> Result<HashMap<ProductId, CategoryMembership>> {
    if product_ids.is_empty() {
        debug!("no product ids, skipping category lookup");
        return Ok(HashMap::new());
    }

    let aggregates = source.category_aggregates(store_id, product_ids).await?;

    let mut result = HashMap::with_capacity(aggregates.len());
    for aggregate in aggregates {
        let product_id = aggregate.product_id;
        result.insert(product_id, aggregate.into_membership(include_visibility)?);
    }

    debug!(found = result.len(), "category data loaded");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FixtureSource, NamedRow, category_row};
    use pretty_assertions::assert_eq;

    #[test]
    fn partitions_parents_and_anchors() {
        let rows = vec![
            category_row(1, 10, true, 3).named(Some("Shoes"), None),
            category_row(1, 20, false, 7),
        ];
        let aggregates = aggregate_rows(rows);
        assert_eq!(aggregates.len(), 1);

        let membership = aggregates[0].clone().into_membership(true).unwrap();
        assert_eq!(membership.parent_category_ids, vec![10]);
        assert_eq!(membership.anchor_category_ids, vec![20]);
        assert_eq!(membership.category_names, vec!["Shoes".to_string()]);
        assert_eq!(membership.positions, BTreeMap::from([(10, 3), (20, 7)]));
        assert_eq!(membership.visibility, Some(4));
    }

    #[test]
    fn groups_keep_row_order_within_product() {
        let rows = vec![
            category_row(2, 30, true, 0).named(None, Some("Boots")),
            category_row(1, 12, true, 1).named(Some("B"), None),
            category_row(2, 5, true, 2).named(Some("Sale"), None),
            category_row(1, 11, true, 0).named(Some("A"), None),
        ];
        let aggregates = aggregate_rows(rows);
        let ids: Vec<u64> = aggregates.iter().map(|a| a.product_id).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(aggregates[0].parents, vec![12, 11]);
        assert_eq!(aggregates[0].positions, "12_1 11_0");
        assert_eq!(aggregates[1].parents, vec![30, 5]);
        assert_eq!(aggregates[1].names, vec!["Boots".to_string(), "Sale".to_string()]);
    }

    #[test]
    fn empty_names_are_dropped() {
        let rows = vec![
            category_row(1, 10, true, 0).named(Some(""), Some("Global")),
            category_row(1, 11, true, 0).named(None, None),
            category_row(1, 12, true, 0).named(Some("Kept"), None),
        ];
        let membership = aggregate_rows(rows)
            .remove(0)
            .into_membership(true)
            .unwrap();
        assert_eq!(membership.category_names, vec!["Kept".to_string()]);
        assert_eq!(membership.parent_category_ids, vec![10, 11, 12]);
    }

    #[test]
    fn anchor_only_product_has_no_names_or_parents() {
        let rows = vec![category_row(3, 40, false, 2).named(Some("Hidden"), Some("Hidden"))];
        let membership = aggregate_rows(rows)
            .remove(0)
            .into_membership(false)
            .unwrap();
        assert!(membership.parent_category_ids.is_empty());
        assert!(membership.category_names.is_empty());
        assert_eq!(membership.anchor_category_ids, vec![40]);
        assert_eq!(membership.visibility, None);
    }

    #[test]
    fn malformed_position_token_is_an_error() {
        let aggregate = CategoryAggregate {
            product_id: 9,
            parents: vec![10],
            anchors: vec![],
            positions: "10_1 17".into(),
            names: vec![],
            visibility: 1,
        };
        let err = aggregate.into_membership(true).unwrap_err();
        assert!(matches!(
            err,
            CatalogSearchError::MalformedAggregate { product_id: 9, .. }
        ));
        assert!(err.to_string().contains("`17`"));
    }

    #[test]
    fn non_numeric_position_is_an_error() {
        let aggregate = CategoryAggregate {
            product_id: 9,
            parents: vec![10],
            anchors: vec![],
            positions: "10_top".into(),
            names: vec![],
            visibility: 1,
        };
        assert!(aggregate.into_membership(true).is_err());
    }

    #[tokio::test]
    async fn fetch_skips_products_without_rows() {
        let source = FixtureSource::default().with_categories(vec![
            category_row(1, 10, true, 3).named(Some("Shoes"), None),
        ]);
        let data = fetch_category_data(&source, 1, &[1, 2], true).await.unwrap();
        assert_eq!(data.len(), 1);
        assert!(data.contains_key(&1));
        assert!(!data.contains_key(&2));
    }

    #[tokio::test]
    async fn fetch_with_empty_ids_does_not_query() {
        let source = FixtureSource::default();
        let data = fetch_category_data(&source, 1, &[], true).await.unwrap();
        assert!(data.is_empty());
        assert_eq!(source.category_calls(), 0);
    }

    #[tokio::test]
    async fn fetch_propagates_malformed_aggregates() {
        let source = FixtureSource::default().with_aggregates(vec![CategoryAggregate {
            product_id: 1,
            parents: vec![10],
            anchors: vec![],
            positions: "10".into(),
            names: vec![],
            visibility: 4,
        }]);
        let err = fetch_category_data(&source, 1, &[1], true).await.unwrap_err();
        assert!(matches!(err, CatalogSearchError::MalformedAggregate { .. }));
    }
}
