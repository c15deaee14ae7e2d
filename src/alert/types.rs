//! Alert data model
//!
//! An [`Alert`] is created per accepted datagram, handed to the dispatcher and
//! dropped. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cry classification reported by the appliance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryType {
    Hungry,
    Pain,
    Normal,
    /// A label this client does not know; kept verbatim for display.
    Unrecognized(String),
}

impl CryType {
    /// Map a wire label onto a cry type. Matching ignores case and
    /// surrounding whitespace.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "hungry" => CryType::Hungry,
            "pain" => CryType::Pain,
            "normal" => CryType::Normal,
            _ => CryType::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CryType::Hungry => "hungry",
            CryType::Pain => "pain",
            CryType::Normal => "normal",
            CryType::Unrecognized(raw) => raw,
        }
    }
}

impl fmt::Display for CryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One parsed cry-detection broadcast
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub cry_type: CryType,
    /// Detector confidence in [0, 1]
    pub detection_confidence: f64,
    /// Classifier confidence in [0, 1], present only when classification ran
    pub classification_confidence: Option<f64>,
    /// Room temperature in °C
    pub temperature: Option<f64>,
    /// Relative humidity in %
    pub humidity: Option<f64>,
    /// Device-local ISO-8601 time; not synchronized with this host
    pub timestamp: String,
}

impl Alert {
    /// Classification confidence when the classifier ran, detection
    /// confidence otherwise.
    pub fn display_confidence(&self) -> f64 {
        self.classification_confidence
            .unwrap_or(self.detection_confidence)
    }

    /// [`display_confidence`](Self::display_confidence) rounded to the
    /// nearest whole percent
    pub fn confidence_percent(&self) -> u8 {
        (self.display_confidence() * 100.0).round().clamp(0.0, 100.0) as u8
    }

    /// Device timestamp reformatted for display, or the raw text if it does
    /// not parse as ISO-8601.
    pub fn display_time(&self) -> String {
        chrono::NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|t| t.format("%H:%M:%S").to_string())
            .or_else(|_| {
                chrono::DateTime::parse_from_rfc3339(&self.timestamp)
                    .map(|t| t.format("%H:%M:%S").to_string())
            })
            .unwrap_or_else(|_| self.timestamp.clone())
    }
}

/// Notification content policy chosen per alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Classifier is confident: the message names the cry type
    HighConfidence,
    /// Generic "crying detected" message without a type claim
    LowConfidence,
}

impl Tier {
    pub fn classify(alert: &Alert, threshold: f64) -> Self {
        match alert.classification_confidence {
            Some(confidence) if confidence >= threshold => Tier::HighConfidence,
            _ => Tier::LowConfidence,
        }
    }
}

/// What observers receive for every dispatched alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub cry_type: String,
    pub confidence_percent: u8,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub timestamp: String,
}

impl From<&Alert> for AlertEvent {
    fn from(alert: &Alert) -> Self {
        Self {
            cry_type: alert.cry_type.label().to_string(),
            confidence_percent: alert.confidence_percent(),
            temperature: alert.temperature,
            humidity: alert.humidity,
            timestamp: alert.timestamp.clone(),
        }
    }
}
