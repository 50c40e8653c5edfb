//! Core domain types for catalog index augmentation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Catalog product identifier.
pub type ProductId = u64;
/// Catalog category identifier.
pub type CategoryId = u64;
/// Store view identifier. Store `0` holds global (admin) values.
pub type StoreId = u32;
/// Customer group identifier (pricing dimension).
pub type CustomerGroupId = u32;
/// Website identifier (pricing dimension).
pub type WebsiteId = u32;

/// Store id under which global attribute values are kept.
pub const GLOBAL_STORE_ID: StoreId = 0;

/// One product's search document: a flat field-name to value mapping.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// A batch of records keyed by product id.
pub type Batch = BTreeMap<ProductId, Record>;

// ---------------------------------------------------------------------------
// Source rows
// ---------------------------------------------------------------------------

/// One joined product-to-category membership row for a single store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub product_id: ProductId,
    pub category_id: CategoryId,
    /// `true` for direct membership, `false` for anchored (inherited) membership.
    pub is_parent: bool,
    /// Sort position of the product inside the category.
    pub position: i64,
    /// Store-scoped category name, if one is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_name: Option<String>,
    /// Global (store 0) category name, if one is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_name: Option<String>,
    /// Product visibility flag within the store.
    pub visibility: i64,
}

impl CategoryRow {
    /// Display name contributed by this row.
    ///
    /// Only direct-parent rows carry a name. A store value, even an empty one,
    /// shadows the global value.
    pub fn resolved_name(&self) -> Option<&str> {
        if !self.is_parent {
            return None;
        }
        self.store_name.as_deref().or(self.global_name.as_deref())
    }
}

/// One precomputed minimum price row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub product_id: ProductId,
    pub customer_group_id: CustomerGroupId,
    pub website_id: WebsiteId,
    pub min_price: f64,
}

// ---------------------------------------------------------------------------
// Derived shapes
// ---------------------------------------------------------------------------

/// Category membership of one product within one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMembership {
    /// Categories the product is directly assigned to, in row order.
    pub parent_category_ids: Vec<CategoryId>,
    /// Categories the product shows up in through an anchor, in row order.
    pub anchor_category_ids: Vec<CategoryId>,
    /// Resolved, non-empty display names of the parent categories.
    pub category_names: Vec<String>,
    /// Sort position per category (parent and anchor alike).
    pub positions: BTreeMap<CategoryId, i64>,
    /// Visibility flag; `None` when the fetch did not request it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<i64>,
}

/// The (customer group, website) pair a minimum price applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PriceScope {
    pub customer_group_id: CustomerGroupId,
    pub website_id: WebsiteId,
}

impl PriceScope {
    pub fn new(customer_group_id: CustomerGroupId, website_id: WebsiteId) -> Self {
        Self {
            customer_group_id,
            website_id,
        }
    }
}

impl fmt::Display for PriceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.customer_group_id, self.website_id)
    }
}

/// Rounded minimum prices of one product, per scope.
pub type PriceTier = BTreeMap<PriceScope, f64>;
