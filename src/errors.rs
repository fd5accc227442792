//! Error types for the status monitor

use std::fmt;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug)]
pub enum MonitorError {
    /// IO operation failed
    Io(std::io::Error),

    /// HTTP request failed
    Http(reqwest::Error),

    /// JSON deserialization failed
    Json(serde_json::Error),

    /// Configuration file could not be parsed
    Yaml(serde_yaml::Error),

    /// Invalid or incomplete configuration
    Config(String),

    /// Repository or CI type outside the supported set
    UnsupportedBackend {
        service: String,
        kind: &'static str,
        backend: String,
    },

    /// Request completed with an unusable outcome (non-2xx, bad URL)
    Transport(String),

    /// Task exceeded its deadline
    Timeout,

    /// Response decoded but carried nothing usable
    Decode(String),
}

impl MonitorError {
    /// Network failures, timeouts and unexpected status codes
    pub fn is_transport(&self) -> bool {
        match self {
            MonitorError::Http(err) => !err.is_decode(),
            MonitorError::Transport(_) | MonitorError::Timeout => true,
            _ => false,
        }
    }

    /// Malformed or unexpected response payloads
    pub fn is_decode(&self) -> bool {
        match self {
            MonitorError::Http(err) => err.is_decode(),
            MonitorError::Json(_) | MonitorError::Decode(_) => true,
            _ => false,
        }
    }

    /// Errors that must abort configuration loading
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            MonitorError::Config(_) | MonitorError::UnsupportedBackend { .. } | MonitorError::Yaml(_)
        )
    }
}

impl fmt::Display for MonitorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorError::Io(err) => write!(f, "IO error: {}", err),
            MonitorError::Http(err) => write!(f, "HTTP error: {}", err),
            MonitorError::Json(err) => write!(f, "JSON error: {}", err),
            MonitorError::Yaml(err) => write!(f, "YAML error: {}", err),
            MonitorError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MonitorError::UnsupportedBackend { service, kind, backend } => write!(
                f,
                "Configuration error: service {}: {} type '{}' is not supported",
                service, kind, backend
            ),
            MonitorError::Transport(msg) => write!(f, "Transport error: {}", msg),
            MonitorError::Timeout => write!(f, "Transport error: task timed out"),
            MonitorError::Decode(msg) => write!(f, "Decode error: {}", msg),
        }
    }
}

impl std::error::Error for MonitorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MonitorError::Io(err) => Some(err),
            MonitorError::Http(err) => Some(err),
            MonitorError::Json(err) => Some(err),
            MonitorError::Yaml(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(err: std::io::Error) -> Self {
        MonitorError::Io(err)
    }
}

impl From<reqwest::Error> for MonitorError {
    fn from(err: reqwest::Error) -> Self {
        MonitorError::Http(err)
    }
}

impl From<serde_json::Error> for MonitorError {
    fn from(err: serde_json::Error) -> Self {
        MonitorError::Json(err)
    }
}

impl From<serde_yaml::Error> for MonitorError {
    fn from(err: serde_yaml::Error) -> Self {
        MonitorError::Yaml(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_backend_names_service_and_type() {
        let err = MonitorError::UnsupportedBackend {
            service: "lib".to_string(),
            kind: "repo",
            backend: "gitlab".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("lib"));
        assert!(msg.contains("gitlab"));
        assert!(err.is_config());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_error_classification() {
        assert!(MonitorError::Timeout.is_transport());
        assert!(MonitorError::Transport("503".to_string()).is_transport());
        assert!(MonitorError::Decode("empty".to_string()).is_decode());

        let json_err = serde_json::from_str::<Vec<u32>>("{").unwrap_err();
        assert!(MonitorError::from(json_err).is_decode());
    }
}
