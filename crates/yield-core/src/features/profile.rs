//! Schema profiling
//!
//! Derives the category vocabulary, numeric ranges and feature order from
//! the training rows. The resulting [`SchemaProfile`] is immutable and is the
//! only source of encoding parameters for both training and serving.

use super::encoder::{encode, parse_numeric, required_value};
use crate::error::{EncodingError, SchemaError};
use crate::models::{FeatureVector, RawRow, CATEGORY_COLUMN, TARGET_COLUMN};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Training-time bounds of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericColumn {
    pub name: String,
    pub min: f64,
    pub max: f64,
}

impl NumericColumn {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    fn include(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    /// Min-max normalize against the training bounds.
    ///
    /// A zero-width range maps every value to exactly 0.0. Values outside the
    /// training range are not clamped.
    pub fn normalize(&self, value: f64) -> f64 {
        let span = self.span();
        if span == 0.0 {
            0.0
        } else {
            (value - self.min) / span
        }
    }

    fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }
}

/// Immutable encoding parameters learned from a training set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaProfile {
    categories: Vec<String>,
    numeric_columns: Vec<NumericColumn>,
    feature_order: Vec<String>,
}

impl SchemaProfile {
    /// Profile a set of rows that already passed the completeness filter
    pub fn from_rows(rows: &[RawRow]) -> Result<Self, SchemaError> {
        let first = rows.first().ok_or(SchemaError::EmptyDataset)?;

        for column in [CATEGORY_COLUMN, TARGET_COLUMN] {
            if first.get(column).is_none() {
                return Err(SchemaError::MissingColumn(column.to_string()));
            }
        }

        let mut numeric_columns: Vec<NumericColumn> = first
            .columns()
            .filter(|column| *column != CATEGORY_COLUMN && *column != TARGET_COLUMN)
            .map(NumericColumn::new)
            .collect();

        let mut categories = Vec::new();
        let mut seen = HashSet::new();

        for row in rows {
            let category = required_value(row, CATEGORY_COLUMN)?;
            if seen.insert(category.to_string()) {
                categories.push(category.to_string());
            }

            for column in numeric_columns.iter_mut() {
                let raw = required_value(row, &column.name)?;
                let value = parse_numeric(&column.name, raw)?;
                column.include(value);
            }
        }

        if let Some(column) = numeric_columns.iter().find(|c| !c.span().is_finite()) {
            return Err(SchemaError::UnboundedRange(column.name.clone()));
        }

        let feature_order = categories
            .iter()
            .map(|category| format!("{CATEGORY_COLUMN}_{category}"))
            .chain(numeric_columns.iter().map(|column| column.name.clone()))
            .collect();

        Ok(Self {
            categories,
            numeric_columns,
            feature_order,
        })
    }

    /// Category vocabulary in first-seen order
    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn numeric_columns(&self) -> &[NumericColumn] {
        &self.numeric_columns
    }

    /// Training (min, max) of a numeric column
    pub fn numeric_range(&self, column: &str) -> Option<(f64, f64)> {
        self.numeric_columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| (c.min, c.max))
    }

    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// Width of every feature vector produced with this profile
    pub fn width(&self) -> usize {
        self.feature_order.len()
    }

    /// Raw columns an inference row must supply
    pub fn input_columns(&self) -> Vec<&str> {
        std::iter::once(CATEGORY_COLUMN)
            .chain(self.numeric_columns.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn encode(&self, row: &RawRow) -> Result<FeatureVector, EncodingError> {
        encode(row, self)
    }

    /// SHA-256 over the feature order and numeric bounds
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for name in &self.feature_order {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
        }
        for column in &self.numeric_columns {
            hasher.update(column.min.to_le_bytes());
            hasher.update(column.max.to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(crop: &str, rainfall: &str, temperature: &str, yield_value: &str) -> RawRow {
        [
            ("Crop_Type", crop),
            ("Rainfall", rainfall),
            ("Temperature", temperature),
            ("Yield", yield_value),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_categories_in_first_seen_order() {
        let rows = vec![
            row("Wheat", "10", "20", "5"),
            row("Corn", "20", "21", "8"),
            row("Wheat", "15", "22", "6"),
            row("Rice", "30", "23", "7"),
        ];
        let profile = SchemaProfile::from_rows(&rows).unwrap();

        assert_eq!(profile.categories(), &["Wheat", "Corn", "Rice"]);
        assert_eq!(
            profile.feature_order(),
            &[
                "Crop_Type_Wheat",
                "Crop_Type_Corn",
                "Crop_Type_Rice",
                "Rainfall",
                "Temperature"
            ]
        );
        assert_eq!(profile.width(), 5);
    }

    #[test]
    fn test_order_is_reproducible() {
        let rows = vec![
            row("Barley", "1", "2", "3"),
            row("Oats", "4", "5", "6"),
            row("Barley", "7", "8", "9"),
        ];
        let first = SchemaProfile::from_rows(&rows).unwrap();
        let second = SchemaProfile::from_rows(&rows).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_numeric_ranges() {
        let rows = vec![
            row("Wheat", "10", "20", "5"),
            row("Corn", "20", "20", "8"),
            row("Rice", "-5.5", "20", "7"),
        ];
        let profile = SchemaProfile::from_rows(&rows).unwrap();

        assert_eq!(profile.numeric_range("Rainfall"), Some((-5.5, 20.0)));
        assert_eq!(profile.numeric_range("Temperature"), Some((20.0, 20.0)));
        assert_eq!(profile.numeric_range("Yield"), None);
        assert!(profile.numeric_columns()[1].is_degenerate());
    }

    #[test]
    fn test_degenerate_range_normalizes_to_zero() {
        let column = NumericColumn {
            name: "Temperature".into(),
            min: 20.0,
            max: 20.0,
        };
        assert_eq!(column.normalize(20.0), 0.0);
        assert_eq!(column.normalize(35.0), 0.0);
    }

    #[test]
    fn test_empty_dataset() {
        assert_eq!(
            SchemaProfile::from_rows(&[]).unwrap_err(),
            SchemaError::EmptyDataset
        );
    }

    #[test]
    fn test_missing_required_columns() {
        let no_crop: RawRow = [("Rainfall", "10"), ("Yield", "5")].into_iter().collect();
        assert_eq!(
            SchemaProfile::from_rows(&[no_crop]).unwrap_err(),
            SchemaError::MissingColumn("Crop_Type".into())
        );

        let no_yield: RawRow = [("Crop_Type", "Wheat"), ("Rainfall", "10")]
            .into_iter()
            .collect();
        assert_eq!(
            SchemaProfile::from_rows(&[no_yield]).unwrap_err(),
            SchemaError::MissingColumn("Yield".into())
        );
    }

    #[test]
    fn test_non_numeric_value_is_schema_failure() {
        let rows = vec![row("Wheat", "10", "20", "5"), row("Corn", "heavy", "20", "8")];
        let err = SchemaProfile::from_rows(&rows).unwrap_err();
        assert_eq!(
            err,
            SchemaError::Encoding(EncodingError::InvalidNumeric {
                column: "Rainfall".into(),
                value: "heavy".into(),
            })
        );
    }

    #[test]
    fn test_unbounded_range_rejected() {
        let rows = vec![
            row("Wheat", "1e308", "20", "5"),
            row("Corn", "-1e308", "20", "8"),
        ];
        assert_eq!(
            SchemaProfile::from_rows(&rows).unwrap_err(),
            SchemaError::UnboundedRange("Rainfall".into())
        );
    }

    #[test]
    fn test_fingerprint_tracks_ranges() {
        let a = SchemaProfile::from_rows(&[row("Wheat", "10", "20", "5")]).unwrap();
        let b = SchemaProfile::from_rows(&[row("Wheat", "11", "20", "5")]).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_input_columns() {
        let profile = SchemaProfile::from_rows(&[row("Wheat", "10", "20", "5")]).unwrap();
        assert_eq!(
            profile.input_columns(),
            vec!["Crop_Type", "Rainfall", "Temperature"]
        );
    }
}
