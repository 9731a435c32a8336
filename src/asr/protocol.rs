//! JSON wire messages for the recognition stream.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Configuration frame sent as the first message on the stream, before
/// any audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub sample_rate_hz: u32,
    pub model: String,
    pub request_id: Uuid,
}

impl StreamConfig {
    /// Serialize to the JSON text frame sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One recognition hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    pub confidence: f64,
}

/// One result in an inbound frame, ranked alternatives first-best.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

/// Inbound frame from the recognizer.
///
/// Interim keep-alive frames carry no results and are dropped by
/// [`RecognitionResponse::primary_alternatives`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResponse {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

impl RecognitionResponse {
    /// Parse an inbound JSON text frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// The first result's alternatives, or None when the frame carries
    /// no usable result.
    pub fn primary_alternatives(&self) -> Option<&[Alternative]> {
        self.results
            .first()
            .filter(|r| !r.alternatives.is_empty())
            .map(|r| r.alternatives.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_frame_shape() {
        let config = StreamConfig {
            sample_rate_hz: 16000,
            model: "photo-query".to_string(),
            request_id: Uuid::nil(),
        };
        let json = config.to_json().expect("serialize");
        assert!(json.contains("\"sample_rate_hz\":16000"));
        assert!(json.contains("\"model\":\"photo-query\""));
        assert!(json.contains("\"request_id\":\"00000000-0000-0000-0000-000000000000\""));
    }

    #[test]
    fn test_response_parse_and_primary_alternatives() {
        let json = r#"{
            "results": [
                {"alternatives": [
                    {"transcript": "millet", "confidence": 0.92},
                    {"transcript": "wheat", "confidence": 0.41}
                ]},
                {"alternatives": [{"transcript": "ignored", "confidence": 0.1}]}
            ]
        }"#;
        let response = RecognitionResponse::from_json(json).expect("parse");
        let alternatives = response.primary_alternatives().expect("primary result");
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].transcript, "millet");
        assert!((alternatives[0].confidence - 0.92).abs() < f64::EPSILON);
    }

    #[test]
    fn test_empty_frame_has_no_primary() {
        let response = RecognitionResponse::from_json("{}").expect("parse");
        assert!(response.primary_alternatives().is_none());

        let response = RecognitionResponse::from_json(r#"{"results": []}"#).expect("parse");
        assert!(response.primary_alternatives().is_none());
    }

    #[test]
    fn test_result_without_alternatives_is_dropped() {
        let json = r#"{"results": [{"alternatives": []}]}"#;
        let response = RecognitionResponse::from_json(json).expect("parse");
        assert!(response.primary_alternatives().is_none());
    }
}
