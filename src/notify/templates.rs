use handlebars::Handlebars;
use serde_json::{json, Value};
use tracing::error;

use crate::alert::{Alert, Tier};
use crate::errors::{AppError, AppResult};
use crate::shared::config::TemplateConfig;

const HIGH_CONFIDENCE: &str = "high-confidence";
const LOW_CONFIDENCE: &str = "low-confidence";

const DEFAULT_HIGH_CONFIDENCE: &str = "Cry type: {{cry_type}} ({{confidence}}% confidence)\
{{#if room}}\n{{room}}{{/if}}";

const DEFAULT_LOW_CONFIDENCE: &str = "Crying detected ({{confidence}}% confidence)\
{{#if room}}\n{{room}}{{/if}}";

pub const ALERT_TITLE: &str = "Baby is crying";

/// Renders notification bodies for the two tiers
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    handlebars: Handlebars<'static>,
}

impl TemplateEngine {
    /// Built-in templates only
    pub fn new() -> AppResult<Self> {
        Self::with_overrides(&TemplateConfig::default())
    }

    /// Built-in templates, replaced by any override present in `config`
    pub fn with_overrides(config: &TemplateConfig) -> AppResult<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        // plain-text notifications, no HTML escaping
        handlebars.register_escape_fn(handlebars::no_escape);

        let high = config.high_confidence.as_deref().unwrap_or(DEFAULT_HIGH_CONFIDENCE);
        let low = config.low_confidence.as_deref().unwrap_or(DEFAULT_LOW_CONFIDENCE);

        for (name, template) in [(HIGH_CONFIDENCE, high), (LOW_CONFIDENCE, low)] {
            handlebars
                .register_template_string(name, template)
                .map_err(|e| AppError::config_with_source(format!("Invalid {name} template"), e))?;
        }

        Ok(TemplateEngine { handlebars })
    }

    /// Template fields for one alert
    pub fn format_alert_data(alert: &Alert) -> Value {
        let room = match (alert.temperature, alert.humidity) {
            (Some(t), Some(h)) => Some(format!("Room: {:.1}°C, {:.1}% humidity", t, h)),
            (Some(t), None) => Some(format!("Room: {:.1}°C", t)),
            (None, Some(h)) => Some(format!("Room: {:.1}% humidity", h)),
            (None, None) => None,
        };

        json!({
            "cry_type": alert.cry_type.label(),
            "confidence": alert.confidence_percent(),
            "temperature": alert.temperature,
            "humidity": alert.humidity,
            "timestamp": alert.timestamp,
            "time": alert.display_time(),
            "room": room,
        })
    }

    /// Render the body for `alert` under `tier`. Never fails: a broken
    /// template falls back to a fixed sentence.
    pub fn render(&self, alert: &Alert, tier: Tier) -> String {
        let name = match tier {
            Tier::HighConfidence => HIGH_CONFIDENCE,
            Tier::LowConfidence => LOW_CONFIDENCE,
        };
        let data = Self::format_alert_data(alert);

        self.handlebars.render(name, &data).unwrap_or_else(|e| {
            error!("Failed to render {} template: {}", name, e);
            match tier {
                Tier::HighConfidence => format!(
                    "Cry type: {} ({}% confidence)",
                    alert.cry_type,
                    alert.confidence_percent()
                ),
                Tier::LowConfidence => {
                    format!("Crying detected ({}% confidence)", alert.confidence_percent())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::decode;

    #[test]
    fn test_high_confidence_names_type() {
        let engine = TemplateEngine::new().unwrap();
        let alert = decode(
            r#"{"cry_type":"hungry","detection_confidence":0.95,"classification_confidence":0.85,"temperature":22.3,"humidity":48.5,"timestamp":"2026-01-22T10:30:45"}"#,
        )
        .unwrap();

        let body = engine.render(&alert, Tier::HighConfidence);
        assert_eq!(body, "Cry type: hungry (85% confidence)\nRoom: 22.3°C, 48.5% humidity");
    }

    #[test]
    fn test_low_confidence_is_generic() {
        let engine = TemplateEngine::new().unwrap();
        let alert = decode(r#"{"cry_type":"hungry","detection_confidence":0.90}"#).unwrap();

        let body = engine.render(&alert, Tier::LowConfidence);
        assert_eq!(body, "Crying detected (90% confidence)");
        assert!(!body.contains("hungry"));
    }

    #[test]
    fn test_custom_override() {
        let config = TemplateConfig {
            high_confidence: Some("{{cry_type}} @ {{time}}".to_string()),
            low_confidence: None,
        };
        let engine = TemplateEngine::with_overrides(&config).unwrap();
        let alert = decode(
            r#"{"cry_type":"pain","detection_confidence":0.9,"classification_confidence":0.9,"timestamp":"2026-01-22T03:04:05"}"#,
        )
        .unwrap();

        assert_eq!(engine.render(&alert, Tier::HighConfidence), "pain @ 03:04:05");
    }

    #[test]
    fn test_invalid_override_rejected() {
        let config = TemplateConfig {
            high_confidence: Some("{{#if}}".to_string()),
            low_confidence: None,
        };
        assert!(TemplateEngine::with_overrides(&config).is_err());
    }
}
