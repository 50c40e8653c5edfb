//! Field-key formatting for engine-added document fields.
//!
//! Every derived field is namespaced with the engine's field prefix so it can
//! never collide with a base record field.

use crate::types::{CategoryId, PriceScope};

/// Builds prefixed field names for one indexing engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldKeys {
    prefix: String,
}

impl FieldKeys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// `{prefix}categories`: direct parent category ids.
    pub fn categories(&self) -> String {
        self.key("categories")
    }

    /// `{prefix}show_in_categories`: anchor category ids.
    pub fn show_in_categories(&self) -> String {
        self.key("show_in_categories")
    }

    /// `{prefix}category_names`
    pub fn category_names(&self) -> String {
        self.key("category_names")
    }

    /// `{prefix}visibility`
    pub fn visibility(&self) -> String {
        self.key("visibility")
    }

    /// `{prefix}position_category_{id}`
    pub fn position_category(&self, category_id: CategoryId) -> String {
        format!("{}position_category_{category_id}", self.prefix)
    }

    /// `{prefix}price_{customer_group}_{website}`
    pub fn price(&self, scope: PriceScope) -> String {
        format!("{}price_{scope}", self.prefix)
    }

    fn key(&self, name: &str) -> String {
        format!("{}{name}", self.prefix)
    }
}
