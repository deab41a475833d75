//! Prediction output formatting

use serde::{Deserialize, Serialize};

/// Decimal places shown to clients
pub const DISPLAY_DECIMALS: usize = 2;

/// Unrounded prediction with the version of the model that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub value: f32,
    pub model_version: String,
}

impl Prediction {
    pub fn to_response(&self) -> PredictionResponse {
        PredictionResponse {
            predicted_yield: format_yield(self.value),
            model_version: self.model_version.clone(),
        }
    }
}

/// Response body for `POST /predict`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub predicted_yield: String,
    pub model_version: String,
}

/// Fixed two-decimal presentation. Negative zero is shown unsigned.
pub fn format_yield(value: f32) -> String {
    let formatted = format!("{:.*}", DISPLAY_DECIMALS, value);
    if formatted.starts_with('-') && formatted[1..].chars().all(|c| c == '0' || c == '.') {
        formatted[1..].to_string()
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_decimals() {
        assert_eq!(format_yield(4.0), "4.00");
        assert_eq!(format_yield(12.3456), "12.35");
        assert_eq!(format_yield(-1.5), "-1.50");
    }

    #[test]
    fn test_negative_zero_unsigned() {
        assert_eq!(format_yield(-0.001), "0.00");
        assert_eq!(format_yield(-0.0), "0.00");
    }

    #[test]
    fn test_response_uses_camel_case() {
        let prediction = Prediction {
            value: 7.126,
            model_version: "v1".into(),
        };
        let body = serde_json::to_value(prediction.to_response()).unwrap();
        assert_eq!(body["predictedYield"], "7.13");
        assert_eq!(body["modelVersion"], "v1");
    }
}
