use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

pub const NETWORK_ERROR_MESSAGE: &str = "Network error: No response from server";
pub const TIMEOUT_MESSAGE: &str = "Scan timeout exceeded";
pub const SCAN_FAILED_MESSAGE: &str = "Scan failed";

/// The only error shape surfaced by the client.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ScannerError {
    pub message: String,
    pub status_code: Option<u16>,
    pub details: Option<Value>,
}

impl ScannerError {
    pub fn new(message: impl Into<String>) -> Self {
        ScannerError {
            message: message.into(),
            status_code: None,
            details: None,
        }
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Request went out but nothing came back.
    pub fn network() -> Self {
        ScannerError::new(NETWORK_ERROR_MESSAGE)
    }

    pub fn timeout(scan_id: &str, timeout: Duration) -> Self {
        ScannerError::new(TIMEOUT_MESSAGE).with_details(json!({
            "scanId": scan_id,
            "timeout": timeout.as_millis() as u64,
        }))
    }

    pub fn scan_failed(scan_id: &str, error: Option<&str>) -> Self {
        ScannerError::new(SCAN_FAILED_MESSAGE).with_details(json!({
            "scanId": scan_id,
            "error": error,
        }))
    }

    /// Builds the error for a non-2xx response. The body's `message` field wins
    /// over the generic status text.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let details = match serde_json::from_slice::<Value>(body) {
            Ok(value) => Some(value),
            Err(_) if body.is_empty() => None,
            Err(_) => Some(Value::String(String::from_utf8_lossy(body).into_owned())),
        };

        let message = details
            .as_ref()
            .and_then(|d| d.get("message"))
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Request failed with status code {}", status));

        ScannerError {
            message,
            status_code: Some(status),
            details,
        }
    }

    /// Re-raises classified errors untouched, prefixes anything else with the
    /// operation label.
    pub fn wrap(label: &str, err: TransportError) -> Self {
        match err {
            TransportError::Scanner(e) => e,
            other => ScannerError::new(format!("{}: {}", label, other)),
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.status_code.is_none() && self.message == TIMEOUT_MESSAGE
    }

    pub fn is_network_error(&self) -> bool {
        self.status_code.is_none() && self.message == NETWORK_ERROR_MESSAGE
    }

    pub fn is_scan_failed(&self) -> bool {
        self.status_code.is_none() && self.message == SCAN_FAILED_MESSAGE
    }
}

/// Failure of a single raw call, before the operation label is applied.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Scanner(#[from] ScannerError),

    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("{0}")]
    Decode(#[from] serde_json::Error),
}
