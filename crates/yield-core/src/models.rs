//! Core data models for the yield pipeline

use serde::{Deserialize, Serialize};

/// Categorical column expanded into the one-hot block
pub const CATEGORY_COLUMN: &str = "Crop_Type";

/// Regression target column
pub const TARGET_COLUMN: &str = "Yield";

/// A raw dataset record: column name to string value, in header order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing any previous value for the same column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| *name == column) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// True when every listed column is present with a non-blank value
    pub fn is_complete<S: AsRef<str>>(&self, columns: &[S]) -> bool {
        columns.iter().all(|column| {
            self.get(column.as_ref())
                .map(|value| !value.trim().is_empty())
                .unwrap_or(false)
        })
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Encoded model input, one value per entry of the profile's feature order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector(pub Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
