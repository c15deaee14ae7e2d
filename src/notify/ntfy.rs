//! ntfy push surface
//!
//! Forwards notifications to an ntfy topic so alerts reach a phone even when
//! the listener host has no display. `post` and `cancel` only queue a request;
//! a single delivery worker sends them one at a time in queue order and logs
//! failures. The notification id travels as the ntfy sequence id, so a later
//! message with the same id updates the earlier one on the subscriber and
//! `cancel` deletes it.

use flume::{Receiver, Sender};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use super::surface::{Channel, Notification, NotificationSurface, Priority};
use crate::errors::{AppError, AppResult, NotifyChannel};
use crate::shared::config::NtfyConfig;

/// JSON body accepted by ntfy's publish endpoint
#[derive(Debug, Clone, Serialize)]
pub struct NtfyMessage {
    pub topic: String,
    pub sequence_id: String,
    pub title: String,
    pub message: String,
    pub priority: u8,
    pub tags: Vec<String>,
}

impl NtfyMessage {
    pub fn from_notification(topic: &str, notification: &Notification) -> Self {
        let priority = match (notification.channel, notification.priority) {
            (Channel::Monitoring, _) => 1,
            (_, Priority::Low) => 2,
            (_, Priority::Default) => 3,
            (_, Priority::High) => 5,
        };
        let mut tags = vec![notification.id.clone()];
        if notification.channel == Channel::Alerts {
            tags.push("baby".to_string());
        }

        Self {
            topic: topic.to_string(),
            sequence_id: notification.id.clone(),
            title: notification.title.clone(),
            message: notification.body.clone(),
            priority,
            tags,
        }
    }
}

/// Work item for the delivery worker
#[derive(Debug, Clone)]
enum NtfyRequest {
    Publish(NtfyMessage),
    Delete { sequence_id: String },
}

/// HTTP side of the surface, owned by the delivery worker
#[derive(Clone)]
struct NtfyClient {
    client: Client,
    server_url: Url,
    topic: String,
    auth_token: Option<String>,
}

impl NtfyClient {
    fn build_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                AppError::notify_with_source(NotifyChannel::Visual, "Invalid auth token", e)
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// `<server>/<topic>/<sequence_id>`
    fn message_url(&self, sequence_id: &str) -> AppResult<Url> {
        let mut url = self.server_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AppError::notify(
                    NotifyChannel::Visual,
                    format!("ntfy server URL cannot take a path: {}", self.server_url),
                )
            })?
            .pop_if_empty()
            .push(&self.topic)
            .push(sequence_id);
        Ok(url)
    }

    async fn send(&self, request: &NtfyRequest) -> AppResult<()> {
        let builder = match request {
            NtfyRequest::Publish(message) => {
                self.client.post(self.server_url.as_str()).json(message)
            }
            NtfyRequest::Delete { sequence_id } => {
                self.client.delete(self.message_url(sequence_id)?)
            }
        };
        let response = builder.headers(self.build_headers()?).send().await?;

        let status = response.status();
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::HttpStatus {
                status_code: status.as_u16(),
                reason,
            });
        }
        Ok(())
    }

    /// Deliver queued requests until every sender is gone
    async fn run(self, requests: Receiver<NtfyRequest>) {
        debug!("ntfy delivery worker started");
        while let Ok(request) = requests.recv_async().await {
            match (&request, self.send(&request).await) {
                (NtfyRequest::Publish(message), Ok(())) => {
                    debug!("Pushed '{}' to ntfy topic {}", message.title, message.topic)
                }
                (NtfyRequest::Delete { sequence_id }, Ok(())) => {
                    debug!("Deleted ntfy message {}", sequence_id)
                }
                (_, Err(e)) => error!("Failed to deliver ntfy request: {}", e),
            }
        }
        info!("ntfy delivery worker stopped");
    }
}

pub struct NtfySurface {
    topic: String,
    requests: Sender<NtfyRequest>,
}

impl NtfySurface {
    /// Build the client and spawn its delivery worker on the current tokio
    /// runtime.
    pub fn new(config: &NtfyConfig) -> AppResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.unwrap_or(10));
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("cry-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                AppError::notify_with_source(
                    NotifyChannel::Visual,
                    "Failed to create HTTP client",
                    e,
                )
            })?;
        let worker = NtfyClient {
            client,
            server_url: Url::parse(&config.server_url)?,
            topic: config.topic.clone(),
            auth_token: config.auth_token.clone(),
        };

        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            AppError::notify_with_source(
                NotifyChannel::Visual,
                "ntfy surface needs a tokio runtime",
                e,
            )
        })?;
        let (requests, receiver) = flume::unbounded();
        handle.spawn(worker.run(receiver));

        Ok(Self {
            topic: config.topic.clone(),
            requests,
        })
    }

    fn enqueue(&self, request: NtfyRequest) -> AppResult<()> {
        self.requests.send(request).map_err(|_| {
            AppError::notify(NotifyChannel::Visual, "ntfy delivery worker is gone")
        })
    }
}

impl NotificationSurface for NtfySurface {
    fn post(&self, notification: &Notification) -> AppResult<()> {
        self.enqueue(NtfyRequest::Publish(NtfyMessage::from_notification(
            &self.topic,
            notification,
        )))
    }

    fn cancel(&self, id: &str) -> AppResult<()> {
        self.enqueue(NtfyRequest::Delete {
            sequence_id: id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::surface::{CRY_ALERT_ID, MONITORING_ID};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::time::{sleep, timeout};

    #[derive(Debug)]
    struct Recorded {
        method: String,
        path: String,
        body: String,
    }

    /// HTTP/1.1 stub that records each request before answering 200. The
    /// first answer is held back by `first_delay`.
    async fn recording_server(first_delay: Duration) -> (Url, flume::Receiver<Recorded>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let (seen, recorded) = flume::unbounded();
        let first = Arc::new(AtomicBool::new(true));

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, seen.clone(), first.clone(), first_delay));
            }
        });
        (url, recorded)
    }

    async fn serve(
        stream: TcpStream,
        seen: flume::Sender<Recorded>,
        first: Arc<AtomicBool>,
        first_delay: Duration,
    ) {
        let (read, mut write) = stream.into_split();
        let mut reader = BufReader::new(read);
        loop {
            let mut request_line = String::new();
            if reader.read_line(&mut request_line).await.unwrap_or(0) == 0 {
                return;
            }
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).await.unwrap_or(0) == 0 {
                    return;
                }
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).await.unwrap();

            if first.swap(false, Ordering::SeqCst) {
                sleep(first_delay).await;
            }
            let _ = seen.send(Recorded {
                method,
                path,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
            write
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
        }
    }

    fn alert(body: &str) -> Notification {
        Notification {
            id: CRY_ALERT_ID.to_string(),
            channel: Channel::Alerts,
            title: "Baby is crying".to_string(),
            body: body.to_string(),
            priority: Priority::High,
            ongoing: false,
        }
    }

    fn config_for(server_url: &Url) -> NtfyConfig {
        NtfyConfig {
            server_url: server_url.to_string(),
            topic: "nursery".to_string(),
            auth_token: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn test_alert_maps_to_urgent_priority() {
        let message = NtfyMessage::from_notification(
            "nursery",
            &alert("Cry type: hungry (85% confidence)"),
        );

        assert_eq!(message.topic, "nursery");
        assert_eq!(message.sequence_id, CRY_ALERT_ID);
        assert_eq!(message.priority, 5);
        assert_eq!(message.tags, vec![CRY_ALERT_ID.to_string(), "baby".to_string()]);
    }

    #[test]
    fn test_indicator_maps_to_min_priority() {
        let message =
            NtfyMessage::from_notification("nursery", &Notification::monitoring_indicator(5005));
        assert_eq!(message.priority, 1);
        assert_eq!(message.sequence_id, MONITORING_ID);
        assert_eq!(message.tags, vec![MONITORING_ID.to_string()]);
    }

    #[test]
    fn test_new_outside_runtime_fails_cleanly() {
        let result = NtfySurface::new(&NtfyConfig::default());
        assert!(matches!(
            result,
            Err(AppError::Notify { channel: NotifyChannel::Visual, .. })
        ));
    }

    #[test]
    fn test_invalid_server_url() {
        let config = NtfyConfig {
            server_url: "not a url".to_string(),
            ..NtfyConfig::default()
        };
        assert!(NtfySurface::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_requests_are_delivered_in_order() {
        // the first answer is slow; a later request must still wait for it
        let (server_url, recorded) = recording_server(Duration::from_millis(200)).await;
        let surface = NtfySurface::new(&config_for(&server_url)).unwrap();

        surface.post(&alert("Cry type: hungry (85% confidence)")).unwrap();
        surface.post(&alert("Crying detected (90% confidence)")).unwrap();
        surface.cancel(CRY_ALERT_ID).unwrap();

        let mut requests = Vec::new();
        for _ in 0..3 {
            let request = timeout(Duration::from_secs(5), recorded.recv_async())
                .await
                .expect("ntfy request never arrived")
                .unwrap();
            requests.push(request);
        }

        assert_eq!(requests[0].method, "POST");
        assert!(requests[0].body.contains("85% confidence"));
        assert_eq!(requests[1].method, "POST");
        assert!(requests[1].body.contains("90% confidence"));
        assert!(requests[1].body.contains(r#""sequence_id":"cry-alert""#));
        assert_eq!(requests[2].method, "DELETE");
        assert_eq!(requests[2].path, "/nursery/cry-alert");
    }

    #[test]
    fn test_message_url_keeps_server_path() {
        let client = NtfyClient {
            client: Client::new(),
            server_url: Url::parse("https://push.example.org/ntfy/").unwrap(),
            topic: "nursery".to_string(),
            auth_token: None,
        };
        assert_eq!(
            client.message_url(MONITORING_ID).unwrap().as_str(),
            "https://push.example.org/ntfy/nursery/cry-monitor-active"
        );
    }
}
