//! Training set assembly

use super::encoder::{parse_numeric, required_value};
use super::profile::SchemaProfile;
use crate::error::{EncodingError, SchemaError};
use crate::models::{FeatureVector, RawRow, CATEGORY_COLUMN, TARGET_COLUMN};

/// Encoded features and targets, row-aligned, plus the profile that encoded them
#[derive(Debug, Clone)]
pub struct TrainingSet {
    features: Vec<FeatureVector>,
    targets: Vec<f32>,
    profile: SchemaProfile,
    dropped_rows: usize,
}

impl TrainingSet {
    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    pub fn targets(&self) -> &[f32] {
        &self.targets
    }

    pub fn profile(&self) -> &SchemaProfile {
        &self.profile
    }

    /// Number of rows excluded by the completeness filter
    pub fn dropped_rows(&self) -> usize {
        self.dropped_rows
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn into_profile(self) -> SchemaProfile {
        self.profile
    }
}

/// Filter incomplete rows, profile the rest, then encode features and parse targets.
///
/// Completeness is judged against the header of the first row. A complete row
/// with a non-numeric value is a hard failure rather than a dropped row.
pub fn build_dataset(rows: &[RawRow]) -> Result<TrainingSet, SchemaError> {
    let header: Vec<&str> = rows
        .first()
        .ok_or(SchemaError::EmptyDataset)?
        .columns()
        .collect();

    for column in [CATEGORY_COLUMN, TARGET_COLUMN] {
        if !header.contains(&column) {
            return Err(SchemaError::MissingColumn(column.to_string()));
        }
    }

    let valid: Vec<RawRow> = rows
        .iter()
        .filter(|row| row.is_complete(&header))
        .cloned()
        .collect();
    let dropped_rows = rows.len() - valid.len();

    let profile = SchemaProfile::from_rows(&valid)?;

    let mut features = Vec::with_capacity(valid.len());
    let mut targets = Vec::with_capacity(valid.len());
    for row in &valid {
        features.push(profile.encode(row)?);
        let raw = required_value(row, TARGET_COLUMN)?;
        let target = parse_numeric(TARGET_COLUMN, raw)? as f32;
        if !target.is_finite() {
            return Err(EncodingError::InvalidNumeric {
                column: TARGET_COLUMN.to_string(),
                value: raw.to_string(),
            }
            .into());
        }
        targets.push(target);
    }

    Ok(TrainingSet {
        features,
        targets,
        profile,
        dropped_rows,
    })
}
