//! Shared types, error model, and configuration for catalogsearch.
//!
//! This crate is the foundation depended on by all other catalogsearch crates.
//! It provides:
//! - [`CatalogSearchError`]: the unified error type
//! - Domain types ([`CategoryRow`], [`PriceRow`], [`CategoryMembership`], [`PriceTier`])
//! - Field-key formatting ([`FieldKeys`])
//! - Configuration ([`AppConfig`], [`IndexSettings`], config loading)

pub mod config;
pub mod error;
pub mod fields;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, EngineConfig, IndexConfig, IndexSettings, StorageConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, validate_config,
};
pub use error::{CatalogSearchError, Result};
pub use fields::FieldKeys;
pub use types::{
    Batch, CategoryId, CategoryMembership, CategoryRow, CustomerGroupId, GLOBAL_STORE_ID,
    PriceRow, PriceScope, PriceTier, ProductId, Record, StoreId, WebsiteId,
};
