//! Price tier fetcher: minimum price per (customer group, website).

use std::collections::HashMap;

use tracing::{debug, instrument};

use catalogsearch_shared::{PriceScope, PriceTier, ProductId, Result};

use crate::source::CatalogSource;

/// Significant digits kept before the final rounding step.
const PRE_ROUND_DIGITS: i32 = 15;

/// Round `value` to `precision` decimal places, half away from zero.
///
/// The scaled value is first rounded to 15 significant digits so that
/// decimal halves stored slightly below the midpoint (`1.005` is
/// `1.00499999...` in binary) still round up.
pub fn round_price(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    pre_round(value * factor).round() / factor
}

/// Round `scaled` to [`PRE_ROUND_DIGITS`] significant digits.
fn pre_round(scaled: f64) -> f64 {
    if scaled == 0.0 || !scaled.is_finite() {
        return scaled;
    }
    let magnitude = scaled.abs().log10().floor() as i32 + 1;
    let digits = PRE_ROUND_DIGITS - magnitude;
    if !(1..=300).contains(&digits) {
        return scaled;
    }
    let shift = 10f64.powi(digits);
    (scaled * shift).round() / shift
}

/// Fetch price tiers for `product_ids`.
///
/// `None` or an empty slice loads every product. Products without a price
/// row are absent from the result.
#[instrument(skip_all, fields(products = product_ids.map_or(0, <[ProductId]>::len)))]
pub async fn fetch_price_tiers(
    source: &dyn CatalogSource,
    product_ids: Option<&[ProductId]>,
    precision: u32,
) -> Result<HashMap<ProductId, PriceTier>> {
    let rows = source.price_rows(product_ids).await?;

    let mut result: HashMap<ProductId, PriceTier> = HashMap::new();
    for row in &rows {
        result.entry(row.product_id).or_default().insert(
            PriceScope::new(row.customer_group_id, row.website_id),
            round_price(row.min_price, precision),
        );
    }

    debug!(rows = rows.len(), found = result.len(), "price tiers loaded");
    Ok(result)
}
