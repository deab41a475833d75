//! Row encoding
//!
//! Turns a raw row into a fixed-width feature vector: a one-hot block in
//! profile category order followed by min-max normalized numeric columns.

use super::profile::SchemaProfile;
use crate::error::EncodingError;
use crate::models::{FeatureVector, RawRow, CATEGORY_COLUMN};
use tracing::debug;

/// Encode a row with a previously built profile.
///
/// A category missing from the profile vocabulary yields an all-zero one-hot
/// block rather than an error, and the vocabulary is left untouched.
pub fn encode(row: &RawRow, profile: &SchemaProfile) -> Result<FeatureVector, EncodingError> {
    let category = required_value(row, CATEGORY_COLUMN)?;

    let mut values = Vec::with_capacity(profile.width());
    let mut matched = false;
    for known in profile.categories() {
        let hit = known == category;
        matched |= hit;
        values.push(if hit { 1.0 } else { 0.0 });
    }
    if !matched {
        debug!(category = %category, "Unknown category, one-hot block left at zero");
    }

    for column in profile.numeric_columns() {
        let raw = required_value(row, &column.name)?;
        let value = parse_numeric(&column.name, raw)?;
        let normalized = column.normalize(value) as f32;
        if !normalized.is_finite() {
            return Err(EncodingError::InvalidNumeric {
                column: column.name.clone(),
                value: raw.to_string(),
            });
        }
        values.push(normalized);
    }

    debug_assert_eq!(values.len(), profile.width());
    Ok(FeatureVector(values))
}

/// Trimmed, non-empty value of a column
pub(crate) fn required_value<'a>(row: &'a RawRow, column: &str) -> Result<&'a str, EncodingError> {
    row.get(column)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| EncodingError::MissingField(column.to_string()))
}

/// Parse a finite decimal number
pub(crate) fn parse_numeric(column: &str, raw: &str) -> Result<f64, EncodingError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| EncodingError::InvalidNumeric {
            column: column.to_string(),
            value: raw.to_string(),
        })
}
