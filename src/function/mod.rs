pub mod config;
pub mod transport;
pub mod scanner;
pub mod report;
pub mod error;
pub mod output;
pub mod commands;

pub use self::config::{ClientConfig, Command, WaitOptions};
pub use self::scanner::{create_client, ScannerClient};
pub use self::report::{
    HealthStatus, ListScansParams, ScanConfig, ScanMetadata, ScanRequest, ScanResponse,
    ScanResult, ScanStatus, Severity, UsageStats, Vulnerability,
};
pub use self::error::{ScannerError, TransportError};
