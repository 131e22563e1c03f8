//! Type conversion for the `last_review` column.

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

use crate::error::Result;

/// Datetime layouts tried first; the calendar date is kept, the time dropped.
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Date layouts tried in order. ISO-8601 first, then the fixed fallback list.
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y", "%B %d, %Y"];

/// Parse one raw review-date value.
///
/// Empty and whitespace-only values are null. Each layout is tried in the
/// fixed order above; the first match wins, so the conversion is deterministic
/// across runs regardless of what the rest of the column looks like.
pub(crate) fn parse_review_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, fmt) {
            return Some(dt.date());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

/// Convert a string series to a `Date` series.
///
/// Values that parse with none of the known layouts become null rather than
/// failing the conversion. Returns the converted series and the count of
/// non-null input values that could not be parsed.
pub(crate) fn string_to_date(series: &Series) -> Result<(Series, usize)> {
    // Nothing to do when an upstream stage already normalized the column.
    if series.dtype() == &DataType::Date {
        return Ok((series.clone(), 0));
    }

    let str_series = series.str()?;
    let mut result_vec: Vec<Option<i32>> = Vec::with_capacity(str_series.len());
    let mut unparseable = 0usize;

    for opt_val in str_series.into_iter() {
        match opt_val {
            Some(val) => match parse_review_date(val) {
                Some(date) => result_vec.push(Some(days_since_epoch(date))),
                None => {
                    if !val.trim().is_empty() {
                        unparseable += 1;
                    }
                    result_vec.push(None);
                }
            },
            None => result_vec.push(None),
        }
    }

    let days = Series::new(series.name().clone(), result_vec);
    Ok((days.cast(&DataType::Date)?, unparseable))
}

/// Days between the Unix epoch and `date`, the physical representation of
/// polars' `Date` type.
fn days_since_epoch(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}
