//! SQL migration definitions for the catalog index database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a batch of SQL statements.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: category product index, category names, price index",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Precomputed product-to-category membership per store
CREATE TABLE IF NOT EXISTS catalog_category_product_index (
    category_id INTEGER NOT NULL,
    product_id  INTEGER NOT NULL,
    store_id    INTEGER NOT NULL,
    position    INTEGER NOT NULL DEFAULT 0,
    is_parent   INTEGER NOT NULL DEFAULT 0,
    visibility  INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (category_id, product_id, store_id)
);

CREATE INDEX IF NOT EXISTS idx_category_product_store
    ON catalog_category_product_index(product_id, store_id);

-- Category display names; store_id 0 holds the global value
CREATE TABLE IF NOT EXISTS catalog_category_name (
    category_id INTEGER NOT NULL,
    store_id    INTEGER NOT NULL,
    value       TEXT,
    PRIMARY KEY (category_id, store_id)
);

-- Precomputed minimum price per customer group and website
CREATE TABLE IF NOT EXISTS catalog_product_index_price (
    product_id        INTEGER NOT NULL,
    customer_group_id INTEGER NOT NULL,
    website_id        INTEGER NOT NULL,
    min_price         REAL NOT NULL,
    PRIMARY KEY (product_id, customer_group_id, website_id)
);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
