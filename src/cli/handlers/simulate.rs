//! Device stand-in
//!
//! Sends a single alert datagram the way the monitoring appliance would, for
//! checking trust settings and notification rendering end to end.

use super::super::CliContext;
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

/// Fields of a simulated alert; absent options are left out of the payload
#[derive(Debug, Clone)]
pub struct SimulatedAlert {
    pub cry_type: String,
    pub detection: f64,
    pub classification: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl SimulatedAlert {
    pub fn to_payload(&self) -> String {
        let mut payload = Map::new();
        payload.insert("cry_type".to_string(), json!(self.cry_type));
        payload.insert("detection_confidence".to_string(), json!(self.detection));

        let optional = [
            ("classification_confidence", self.classification),
            ("temperature", self.temperature),
            ("humidity", self.humidity),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                payload.insert(key.to_string(), json!(value));
            }
        }

        payload.insert(
            "timestamp".to_string(),
            json!(chrono::Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()),
        );
        Value::Object(payload).to_string()
    }
}

/// Handler for the simulate command
pub struct SimulateHandler<'a> {
    context: &'a CliContext,
}

impl<'a> SimulateHandler<'a> {
    pub fn new(context: &'a CliContext) -> Self {
        Self { context }
    }

    pub async fn handle_simulate(
        &self,
        alert: SimulatedAlert,
        target: Option<SocketAddr>,
        raw: Option<String>,
    ) -> Result<()> {
        let target = target.unwrap_or_else(|| {
            let port = self.context.config_manager.config().listener.port;
            SocketAddr::from((Ipv4Addr::LOCALHOST, port))
        });
        let payload = raw.unwrap_or_else(|| alert.to_payload());

        let bind_addr: SocketAddr = if target.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(bind_addr)
            .await
            .context("Failed to open sending socket")?;
        socket
            .set_broadcast(true)
            .context("Failed to enable broadcast")?;

        debug!("Sending payload to {}: {}", target, payload);
        let sent = socket
            .send_to(payload.as_bytes(), target)
            .await
            .with_context(|| format!("Failed to send alert to {}", target))?;

        println!("Sent {} bytes to {}", sent, target);
        println!("{}", payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cry_monitor::alert::{decode, CryType, Tier};

    #[test]
    fn test_payload_decodes() {
        let alert = SimulatedAlert {
            cry_type: "pain".to_string(),
            detection: 0.92,
            classification: Some(0.81),
            temperature: Some(21.5),
            humidity: None,
        };

        let decoded = decode(&alert.to_payload()).unwrap();
        assert_eq!(decoded.cry_type, CryType::Pain);
        assert_eq!(decoded.confidence_percent(), 81);
        assert_eq!(decoded.temperature, Some(21.5));
        assert_eq!(decoded.humidity, None);
        assert_eq!(Tier::classify(&decoded, 0.70), Tier::HighConfidence);
    }

    #[test]
    fn test_payload_omits_classification() {
        let alert = SimulatedAlert {
            cry_type: "hungry".to_string(),
            detection: 0.9,
            classification: None,
            temperature: None,
            humidity: None,
        };

        let payload = alert.to_payload();
        assert!(!payload.contains("classification_confidence"));
        assert!(payload.contains("\"timestamp\""));
    }
}
