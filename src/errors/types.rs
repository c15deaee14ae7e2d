//! Error types for the cry-monitor service
//!
//! Errors are grouped by the subsystem that raises them. Only the lifecycle
//! layer ever turns one of these into a user-visible outcome, and it does so
//! through the state channel rather than by propagating the error upward.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Invalid configuration value for '{key}': {value}")]
    InvalidConfigValue {
        key: String,
        value: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Listener errors
    #[error("Failed to bind UDP listener on {addr}: {reason}")]
    Bind {
        addr: SocketAddr,
        reason: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Failed to receive datagram: {reason}")]
    Receive {
        reason: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Failed to decode alert payload: {0}")]
    Decode(#[from] DecodeError),

    // Notification errors
    #[error("Notification failed on {channel} channel: {message}")]
    Notify {
        channel: NotifyChannel,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Wake hold errors
    #[error("Wake hold error: {message}")]
    WakeHold {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Lifecycle errors
    #[error("Another cry-monitor listener is already running (PID: {pid})")]
    AlreadyRunning { pid: u32 },

    // I/O errors
    #[error("File I/O error for '{path}': {operation}")]
    Io {
        path: PathBuf,
        operation: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Serialization errors
    #[error("JSON error: {context}")]
    Json {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("TOML parsing error: {context}")]
    TomlParsing {
        context: String,
        #[source]
        source: Option<BoxedSource>,
    },

    // Network errors
    #[error("HTTP request failed: {url}")]
    HttpRequest {
        url: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("HTTP {status_code}: {reason}")]
    HttpStatus { status_code: u16, reason: String },

    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("{message}")]
    Other {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Which half of the notifier failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyChannel {
    Visual,
    Haptic,
}

impl std::fmt::Display for NotifyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyChannel::Visual => write!(f, "visual"),
            NotifyChannel::Haptic => write!(f, "haptic"),
        }
    }
}

/// Reasons a datagram payload could not become an [`Alert`](crate::alert::Alert)
///
/// Decode failures are local to one message: the listener logs them and keeps
/// receiving.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    #[error("cry_type must not be empty")]
    EmptyCryType,

    #[error("{field} out of range: {value}")]
    ConfidenceOutOfRange { field: &'static str, value: f64 },
}

impl AppError {
    /// Create a new Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new Config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid value error for a config key
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            key: key.into(),
            value: value.into(),
            source: None,
        }
    }

    /// Create a bind error from the underlying socket failure
    pub fn bind(addr: SocketAddr, source: std::io::Error) -> Self {
        let reason = match source.kind() {
            std::io::ErrorKind::AddrInUse => "address already in use".to_string(),
            std::io::ErrorKind::PermissionDenied => "permission denied".to_string(),
            std::io::ErrorKind::AddrNotAvailable => "address not available".to_string(),
            _ => source.to_string(),
        };
        Self::Bind {
            addr,
            reason,
            source: Some(Box::new(source)),
        }
    }

    /// Create a receive error from the underlying socket failure
    pub fn receive(source: std::io::Error) -> Self {
        Self::Receive {
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a notification error without a source
    pub fn notify(channel: NotifyChannel, message: impl Into<String>) -> Self {
        Self::Notify {
            channel,
            message: message.into(),
            source: None,
        }
    }

    /// Create a notification error with source
    pub fn notify_with_source(
        channel: NotifyChannel,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Notify {
            channel,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a wake hold error
    pub fn wake_hold(message: impl Into<String>) -> Self {
        Self::WakeHold {
            message: message.into(),
            source: None,
        }
    }

    /// Create a wake hold error with source
    pub fn wake_hold_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::WakeHold {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new I/O error with source
    pub fn io_with_source(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same operation later can succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Receive { .. } => true,
            Self::HttpRequest { .. } => true,
            Self::HttpStatus { status_code, .. } => {
                *status_code >= 500 || *status_code == 408 || *status_code == 429
            }
            Self::Notify { .. } => true,
            _ => false,
        }
    }

    /// Get the error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config { .. } | Self::InvalidConfigValue { .. } => "config",
            Self::Bind { .. } | Self::Receive { .. } => "listener",
            Self::Decode(_) => "decode",
            Self::Notify { .. } => "notification",
            Self::WakeHold { .. } => "wake_hold",
            Self::AlreadyRunning { .. } => "lifecycle",
            Self::Io { .. } => "io",
            Self::Json { .. } | Self::TomlParsing { .. } => "serialization",
            Self::HttpRequest { .. } | Self::HttpStatus { .. } => "network",
            Self::Internal { .. } | Self::Other { .. } => "internal",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        let operation = match err.kind() {
            std::io::ErrorKind::NotFound => "file not found",
            std::io::ErrorKind::PermissionDenied => "permission denied",
            std::io::ErrorKind::TimedOut => "timeout",
            _ => "I/O operation",
        }
        .to_string();

        Self::Io {
            path: PathBuf::from("unknown"),
            operation,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        let context = if err.is_syntax() {
            format!("syntax error at line {} column {}", err.line(), err.column())
        } else if err.is_eof() {
            "unexpected end of input".to_string()
        } else {
            "data error".to_string()
        };
        Self::Json {
            context,
            source: Some(Box::new(err)),
        }
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::TomlParsing {
            context: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            Self::HttpStatus {
                status_code: status.as_u16(),
                reason: err.to_string(),
            }
        } else {
            Self::HttpRequest {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
                source: Some(Box::new(err)),
            }
        }
    }
}

impl From<url::ParseError> for AppError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidConfigValue {
            key: "url".to_string(),
            value: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}
