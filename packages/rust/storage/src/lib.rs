//! libSQL storage layer for the precomputed catalog indexes.
//!
//! The [`Storage`] struct wraps a libSQL database holding the category/product
//! membership index, category display names, and the minimum price index.
//! The augmentation stage only reads from it; the load helpers exist for the
//! upstream indexers that populate it.
//!
//! **Access rules:**
//! - Catalog indexers: read-write via [`Storage::open`]
//! - Search index builds: read-only via [`Storage::open_readonly`]

mod migrations;

use std::path::Path;

use catalogsearch_shared::{
    CatalogSearchError, CategoryId, CategoryRow, CustomerGroupId, GLOBAL_STORE_ID, PriceRow,
    ProductId, Result, StorageConfig, StoreId, WebsiteId,
};
use libsql::params::Params;
use libsql::{Connection, Database, Value, params};

/// Default number of ids bound into one `IN (...)` lookup.
const DEFAULT_CHUNK_SIZE: usize = 500;

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
    chunk_size: usize,
}

/// One membership entry of the category product index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProductEntry {
    pub category_id: CategoryId,
    pub product_id: ProductId,
    pub store_id: StoreId,
    pub position: i64,
    pub is_parent: bool,
    pub visibility: i64,
}

/// Row counts per catalog table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CatalogCounts {
    pub category_links: u64,
    pub category_names: u64,
    pub prices: u64,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CatalogSearchError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(CatalogSearchError::data_source)?;

        let conn = db.connect().map_err(CatalogSearchError::data_source)?;

        let storage = Self {
            db,
            conn,
            readonly: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(CatalogSearchError::data_source)?;

        let conn = db.connect().map_err(CatalogSearchError::data_source)?;

        Ok(Self {
            db,
            conn,
            readonly: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        })
    }

    /// Open the configured database read-only, honoring its lookup chunk size.
    pub async fn open_with_config(config: &StorageConfig) -> Result<Self> {
        let path = config.resolved_database_path()?;
        tracing::debug!(?path, "opening catalog database");
        Ok(Self::open_readonly(&path)
            .await?
            .with_chunk_size(config.lookup_chunk_size))
    }

    /// Override how many ids are bound into a single lookup statement.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn
                    .execute_batch(migration.sql)
                    .await
                    .map_err(|e| {
                        CatalogSearchError::data_source(format!(
                            "migration v{} failed: {e}",
                            migration.version
                        ))
                    })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(CatalogSearchError::data_source(
                "database is opened in read-only mode",
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Catalog loading
    // -----------------------------------------------------------------------

    /// Insert or update one category membership entry.
    pub async fn upsert_category_product(&self, entry: &CategoryProductEntry) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO catalog_category_product_index
                   (category_id, product_id, store_id, position, is_parent, visibility)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(category_id, product_id, store_id) DO UPDATE SET
                   position = excluded.position,
                   is_parent = excluded.is_parent,
                   visibility = excluded.visibility",
                params![
                    sql_id(entry.category_id)?,
                    sql_id(entry.product_id)?,
                    i64::from(entry.store_id),
                    entry.position,
                    i64::from(entry.is_parent),
                    entry.visibility,
                ],
            )
            .await
            .map_err(CatalogSearchError::data_source)?;
        Ok(())
    }

    /// Set a category's display name for one store (`0` for the global value).
    pub async fn set_category_name(
        &self,
        category_id: CategoryId,
        store_id: StoreId,
        value: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO catalog_category_name (category_id, store_id, value)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(category_id, store_id) DO UPDATE SET value = excluded.value",
                params![sql_id(category_id)?, i64::from(store_id), value],
            )
            .await
            .map_err(CatalogSearchError::data_source)?;
        Ok(())
    }

    /// Insert or update one minimum price row.
    pub async fn upsert_price(&self, row: &PriceRow) -> Result<()> {
        self.check_writable()?;
        self.conn
            .execute(
                "INSERT INTO catalog_product_index_price
                   (product_id, customer_group_id, website_id, min_price)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(product_id, customer_group_id, website_id) DO UPDATE SET
                   min_price = excluded.min_price",
                params![
                    sql_id(row.product_id)?,
                    i64::from(row.customer_group_id),
                    i64::from(row.website_id),
                    row.min_price,
                ],
            )
            .await
            .map_err(CatalogSearchError::data_source)?;
        Ok(())
    }

    /// Count the rows held in each catalog table.
    pub async fn counts(&self) -> Result<CatalogCounts> {
        let mut rows = self
            .conn
            .query(
                "SELECT
                   (SELECT COUNT(*) FROM catalog_category_product_index),
                   (SELECT COUNT(*) FROM catalog_category_name),
                   (SELECT COUNT(*) FROM catalog_product_index_price)",
                params![],
            )
            .await
            .map_err(CatalogSearchError::data_source)?;

        match rows.next().await.map_err(CatalogSearchError::data_source)? {
            Some(row) => Ok(CatalogCounts {
                category_links: column_u64(&row, 0)?,
                category_names: column_u64(&row, 1)?,
                prices: column_u64(&row, 2)?,
            }),
            None => Ok(CatalogCounts::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Bulk lookups
    // -----------------------------------------------------------------------

    /// Joined category membership rows of `product_ids` within `store_id`.
    ///
    /// Rows come back ordered by product id, then category id. Names are only
    /// joined for direct-parent rows; the store value and the global value
    /// are returned side by side.
    pub async fn category_rows(
        &self,
        store_id: StoreId,
        product_ids: &[ProductId],
    ) -> Result<Vec<CategoryRow>> {
        let ids = sorted_unique(product_ids);
        let mut results = Vec::new();

        for chunk in ids.chunks(self.chunk_size) {
            let sql = format!(
                "SELECT cpi.product_id, cpi.category_id, cpi.is_parent, cpi.position,
                        cn_store.value, cn_global.value, cpi.visibility
                 FROM catalog_category_product_index cpi
                 LEFT JOIN catalog_category_name cn_store
                   ON cpi.is_parent = 1
                  AND cn_store.category_id = cpi.category_id
                  AND cn_store.store_id = cpi.store_id
                 LEFT JOIN catalog_category_name cn_global
                   ON cpi.is_parent = 1
                  AND cn_global.category_id = cpi.category_id
                  AND cn_global.store_id = {GLOBAL_STORE_ID}
                 WHERE cpi.store_id = ?1 AND cpi.product_id IN ({})
                 ORDER BY cpi.product_id, cpi.category_id",
                placeholders(2, chunk.len())
            );

            let mut values = Vec::with_capacity(chunk.len() + 1);
            values.push(Value::Integer(i64::from(store_id)));
            values.extend(id_values(chunk)?);

            let mut rows = self
                .conn
                .query(&sql, Params::Positional(values))
                .await
                .map_err(CatalogSearchError::data_source)?;

            while let Some(row) = rows.next().await.map_err(CatalogSearchError::data_source)? {
                results.push(row_to_category_row(&row)?);
            }
        }

        tracing::debug!(
            store_id,
            products = ids.len(),
            rows = results.len(),
            "loaded category rows"
        );
        Ok(results)
    }

    /// Minimum price rows of `product_ids`, or of every product when no
    /// (or an empty) filter is given.
    pub async fn price_rows(&self, product_ids: Option<&[ProductId]>) -> Result<Vec<PriceRow>> {
        let mut results = Vec::new();

        match product_ids.filter(|ids| !ids.is_empty()) {
            None => {
                let mut rows = self
                    .conn
                    .query(
                        "SELECT product_id, customer_group_id, website_id, min_price
                         FROM catalog_product_index_price
                         ORDER BY product_id, customer_group_id, website_id",
                        params![],
                    )
                    .await
                    .map_err(CatalogSearchError::data_source)?;

                while let Some(row) = rows.next().await.map_err(CatalogSearchError::data_source)? {
                    results.push(row_to_price_row(&row)?);
                }
            }
            Some(product_ids) => {
                let ids = sorted_unique(product_ids);
                for chunk in ids.chunks(self.chunk_size) {
                    let sql = format!(
                        "SELECT product_id, customer_group_id, website_id, min_price
                         FROM catalog_product_index_price
                         WHERE product_id IN ({})
                         ORDER BY product_id, customer_group_id, website_id",
                        placeholders(1, chunk.len())
                    );

                    let mut rows = self
                        .conn
                        .query(&sql, Params::Positional(id_values(chunk)?))
                        .await
                        .map_err(CatalogSearchError::data_source)?;

                    while let Some(row) =
                        rows.next().await.map_err(CatalogSearchError::data_source)?
                    {
                        results.push(row_to_price_row(&row)?);
                    }
                }
            }
        }

        tracing::debug!(rows = results.len(), "loaded price rows");
        Ok(results)
    }
}

/// `?start, ?start+1, ...` for `count` positional parameters.
fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn sorted_unique(ids: &[ProductId]) -> Vec<ProductId> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn id_values(ids: &[ProductId]) -> Result<Vec<Value>> {
    ids.iter()
        .map(|&id| sql_id(id).map(Value::Integer))
        .collect()
}

/// SQLite integers are signed; ids beyond `i64::MAX` cannot be stored.
fn sql_id(id: u64) -> Result<i64> {
    i64::try_from(id).map_err(|_| CatalogSearchError::validation(format!("id {id} out of range")))
}

fn column_u64(row: &libsql::Row, idx: i32) -> Result<u64> {
    let value = row
        .get::<i64>(idx)
        .map_err(CatalogSearchError::data_source)?;
    u64::try_from(value).map_err(|_| {
        CatalogSearchError::data_source(format!("column {idx}: negative value {value}"))
    })
}

fn column_u32(row: &libsql::Row, idx: i32) -> Result<u32> {
    let value = row
        .get::<i64>(idx)
        .map_err(CatalogSearchError::data_source)?;
    u32::try_from(value).map_err(|_| {
        CatalogSearchError::data_source(format!("column {idx}: value {value} out of range"))
    })
}

/// Convert a joined membership row to a [`CategoryRow`].
fn row_to_category_row(row: &libsql::Row) -> Result<CategoryRow> {
    Ok(CategoryRow {
        product_id: column_u64(row, 0)?,
        category_id: column_u64(row, 1)?,
        is_parent: row
            .get::<i64>(2)
            .map_err(CatalogSearchError::data_source)?
            != 0,
        position: row
            .get::<i64>(3)
            .map_err(CatalogSearchError::data_source)?,
        store_name: row.get::<String>(4).ok(),
        global_name: row.get::<String>(5).ok(),
        visibility: row
            .get::<i64>(6)
            .map_err(CatalogSearchError::data_source)?,
    })
}

/// Convert a price index row to a [`PriceRow`].
fn row_to_price_row(row: &libsql::Row) -> Result<PriceRow> {
    let customer_group_id: CustomerGroupId = column_u32(row, 1)?;
    let website_id: WebsiteId = column_u32(row, 2)?;
    Ok(PriceRow {
        product_id: column_u64(row, 0)?,
        customer_group_id,
        website_id,
        min_price: row
            .get::<f64>(3)
            .map_err(CatalogSearchError::data_source)?,
    })
}
