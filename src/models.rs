use serde::Serialize;

use crate::classifier::Prediction;

/// JSON body returned by `POST /analyze`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub result: String,
    /// Top-class confidence as a percentage, rounded to two decimals.
    pub predictions: f32,
}

impl From<Prediction> for AnalyzeResponse {
    fn from(prediction: Prediction) -> Self {
        Self {
            result: prediction.label.to_string(),
            predictions: prediction.confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_expected_shape() {
        let response = AnalyzeResponse::from(Prediction {
            label: "Barack Obama",
            confidence: 87.65,
        });

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["result"], "Barack Obama");
        let predictions = json["predictions"].as_f64().unwrap();
        assert!((predictions - 87.65).abs() < 1e-3);
        assert_eq!(json.as_object().unwrap().len(), 2);
    }
}
