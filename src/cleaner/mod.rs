//! Snapshot cleaning transforms.
//!
//! This module holds the only decision logic in the stage:
//! - a price range filter that drops outlier rows, and
//! - normalization of the `last_review` column from text to a calendar date.
//!
//! Both transforms are pure DataFrame-to-DataFrame functions; given identical
//! input bytes and parameters they produce identical output. Snapshot CSV
//! load/save lives here too so the stage runner stays free of polars details.

mod converters;

use std::fs::File;
use std::path::Path;

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use tracing::debug;

use crate::error::{CleaningError, Result, ResultExt};
use crate::utils::{dtype_name, is_numeric_dtype, is_string_dtype};

/// Column holding the nightly price of a listing.
pub const PRICE_COLUMN: &str = "price";

/// Column holding the date of the most recent review, as text in raw data.
pub const LAST_REVIEW_COLUMN: &str = "last_review";

/// Read a snapshot CSV into memory.
///
/// The whole file is materialized; this stage has no streaming mode.
pub fn read_snapshot(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .context(format!("Failed to read snapshot {}", path.display()))
}

/// Write a cleaned snapshot to `path` as CSV, header included, no row-index
/// column.
pub fn write_snapshot(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)
        .context(format!("Failed to create output file {}", path.display()))?;

    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .context(format!("Failed to write snapshot {}", path.display()))?;

    Ok(())
}

/// Keep exactly the rows with `min_price <= price <= max_price`.
///
/// Bounds are inclusive on both ends and row order is preserved. Rows with a
/// null price satisfy neither bound and are dropped.
pub fn filter_price_range(df: &DataFrame, min_price: f64, max_price: f64) -> Result<DataFrame> {
    let column = df
        .column(PRICE_COLUMN)
        .map_err(|_| CleaningError::ColumnNotFound(PRICE_COLUMN.to_string()))?;
    let series = column.as_materialized_series();

    if !is_numeric_dtype(series.dtype()) {
        return Err(CleaningError::ColumnType {
            column: PRICE_COLUMN.to_string(),
            dtype: dtype_name(series.dtype()),
            expected: "numeric".to_string(),
        });
    }

    let float_series = series.cast(&DataType::Float64)?;
    let prices = float_series.f64()?;

    let mut mask_values = Vec::with_capacity(prices.len());
    for opt_val in prices.into_iter() {
        mask_values.push(
            opt_val
                .map(|val| val >= min_price && val <= max_price)
                .unwrap_or(false),
        );
    }

    let mask = BooleanChunked::from_slice("mask".into(), &mask_values);
    let filtered = df.filter(&mask)?;
    debug!(
        "Price filter kept {} of {} rows",
        filtered.height(),
        df.height()
    );

    Ok(filtered)
}

/// Replace the `last_review` text column with a normalized `Date` column.
///
/// Unparseable values become nulls instead of failing the run; the second
/// return value counts them so the caller can log a conversion summary.
pub fn normalize_review_dates(mut df: DataFrame) -> Result<(DataFrame, usize)> {
    let column = df
        .column(LAST_REVIEW_COLUMN)
        .map_err(|_| CleaningError::ColumnNotFound(LAST_REVIEW_COLUMN.to_string()))?;
    let series = column.as_materialized_series();

    if !is_string_dtype(series.dtype()) && series.dtype() != &DataType::Date {
        return Err(CleaningError::ColumnType {
            column: LAST_REVIEW_COLUMN.to_string(),
            dtype: dtype_name(series.dtype()),
            expected: "string".to_string(),
        });
    }

    let (converted, unparseable) = converters::string_to_date(series)?;
    df.replace(LAST_REVIEW_COLUMN, converted)?;

    if unparseable > 0 {
        debug!("{} review dates could not be parsed", unparseable);
    }

    Ok((df, unparseable))
}
