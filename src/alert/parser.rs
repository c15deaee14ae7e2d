//! Datagram payload decoding
//!
//! Payloads are single UTF-8 JSON objects:
//!
//! ```json
//! {"cry_type":"hungry","detection_confidence":0.95,"classification_confidence":0.85,
//!  "temperature":22.3,"humidity":48.5,"timestamp":"2026-01-22T10:30:45"}
//! ```
//!
//! Only `cry_type` is strictly required. An absent `detection_confidence`
//! reads as 0.0 and an absent `timestamp` as an empty string.

use serde::Deserialize;

use super::types::{Alert, CryType};
use crate::errors::DecodeError;

#[derive(Debug, Deserialize)]
struct WirePayload {
    cry_type: Option<String>,
    detection_confidence: Option<f64>,
    classification_confidence: Option<f64>,
    temperature: Option<f64>,
    humidity: Option<f64>,
    timestamp: Option<String>,
}

/// Decode raw datagram bytes.
pub fn decode_bytes(payload: &[u8]) -> Result<Alert, DecodeError> {
    let text = std::str::from_utf8(payload).map_err(|_| DecodeError::InvalidUtf8)?;
    decode(text)
}

/// Decode one payload into an [`Alert`].
pub fn decode(payload: &str) -> Result<Alert, DecodeError> {
    let wire: WirePayload =
        serde_json::from_str(payload).map_err(|e| DecodeError::MalformedJson(e.to_string()))?;

    let cry_type = wire.cry_type.ok_or(DecodeError::MissingField("cry_type"))?;
    if cry_type.trim().is_empty() {
        return Err(DecodeError::EmptyCryType);
    }

    let detection_confidence = check_unit(
        "detection_confidence",
        wire.detection_confidence.unwrap_or(0.0),
    )?;
    let classification_confidence = wire
        .classification_confidence
        .map(|value| check_unit("classification_confidence", value))
        .transpose()?;

    Ok(Alert {
        cry_type: CryType::from_label(&cry_type),
        detection_confidence,
        classification_confidence,
        temperature: wire.temperature,
        humidity: wire.humidity,
        timestamp: wire.timestamp.unwrap_or_default(),
    })
}

fn check_unit(field: &'static str, value: f64) -> Result<f64, DecodeError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(DecodeError::ConfidenceOutOfRange { field, value })
    }
}
