//! The cleaning transform.
//!
//! A pure function of (table, parameters): rows are kept only when price and
//! coordinates pass their range predicates, and `last_review` is coerced to
//! the canonical date form. Applying it again to its own output with the same
//! parameters changes nothing.

use metrics::counter;
use serde::Serialize;
use tracing::{debug, info};

use crate::constants::{
    ACCEPTED_DATE_FORMATS, LAST_REVIEW_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN, MAX_LATITUDE,
    MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE, PRICE_COLUMN,
};
use crate::error::Result;
use crate::table::Table;

/// Caller-supplied price bounds, inclusive on both ends. The ordering of the
/// bounds is not checked; inverted bounds simply match no rows.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CleaningParams {
    pub min_price: f64,
    pub max_price: f64,
}

fn in_range(value: Option<f64>, lo: f64, hi: f64) -> bool {
    matches!(value, Some(v) if v >= lo && v <= hi)
}

pub fn clean(table: &Table, params: &CleaningParams) -> Result<Table> {
    let rows_in = table.n_rows();
    let price = table.float_column(PRICE_COLUMN)?;
    let longitude = table.float_column(LONGITUDE_COLUMN)?;
    let latitude = table.float_column(LATITUDE_COLUMN)?;

    // Independent predicates; their conjunction decides retention.
    let mask: Vec<bool> = (0..rows_in)
        .map(|i| {
            in_range(price[i], params.min_price, params.max_price)
                && in_range(longitude[i], MIN_LONGITUDE, MAX_LONGITUDE)
                && in_range(latitude[i], MIN_LATITUDE, MAX_LATITUDE)
        })
        .collect();

    let mut cleaned = table.retain_rows(&mask);
    let dates = cleaned.coerce_date_column(LAST_REVIEW_COLUMN, ACCEPTED_DATE_FORMATS)?;

    let dropped = rows_in - cleaned.n_rows();
    counter!("listings_rows_in_total").increment(rows_in as u64);
    counter!("listings_rows_dropped_total").increment(dropped as u64);
    info!(
        "Cleaning kept {}/{} rows (price in [{}, {}], {} review dates coerced, {} unparseable)",
        cleaned.n_rows(),
        rows_in,
        params.min_price,
        params.max_price,
        dates.parsed,
        dates.nulled
    );
    debug!("Output schema: {:?}", cleaned.headers());
    Ok(cleaned)
}
