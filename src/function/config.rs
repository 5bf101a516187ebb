// config.rs
use super::{ScanResult, ScanStatus, ScannerError};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use structopt::StructOpt;

pub const DEFAULT_ENDPOINT: &str = "https://xeops-scanner-97758009309.europe-west1.run.app";

/// Connection settings for a [`ScannerClient`](super::ScannerClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub api_endpoint: String,
    pub api_key: String,
    /// Per-call deadline.
    pub timeout: Duration,
    /// Accepted but never applied; calls are not retried.
    pub max_retries: u32,
    /// Accepted but never applied.
    pub retry_delay: Duration,
    /// Trace method, URL and response status of every call.
    pub debug: bool,
}

impl ClientConfig {
    pub fn new(api_endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        ClientConfig {
            api_endpoint: api_endpoint.into(),
            api_key: api_key.into(),
            timeout: Duration::from_millis(60_000),
            max_retries: 3,
            retry_delay: Duration::from_millis(1_000),
            debug: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn validate(&self) -> Result<(), ScannerError> {
        if self.api_endpoint.trim().is_empty() {
            return Err(ScannerError::new("API endpoint is required"));
        }
        if !self.api_endpoint.starts_with("http://") && !self.api_endpoint.starts_with("https://") {
            return Err(ScannerError::new(
                "API endpoint must start with http:// or https://",
            ));
        }

        if self.api_key.trim().is_empty() {
            return Err(ScannerError::new("API key is required"));
        }

        if self.timeout.is_zero() {
            return Err(ScannerError::new("Request timeout must be greater than zero"));
        }

        Ok(())
    }
}

type ProgressFn<'a> = Box<dyn FnMut(&ScanResult) + Send + 'a>;

/// Tuning for [`ScannerClient::wait_for_scan_completion`](super::ScannerClient::wait_for_scan_completion).
pub struct WaitOptions<'a> {
    pub polling_interval: Duration,
    /// Total wall-clock budget, checked before each poll.
    pub timeout: Duration,
    pub on_progress: Option<ProgressFn<'a>>,
}

impl<'a> WaitOptions<'a> {
    pub fn with_polling_interval(mut self, polling_interval: Duration) -> Self {
        self.polling_interval = polling_interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Called with every snapshot, terminal ones included.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: FnMut(&ScanResult) + Send + 'a,
    {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

impl Default for WaitOptions<'_> {
    fn default() -> Self {
        WaitOptions {
            polling_interval: Duration::from_millis(5_000),
            timeout: Duration::from_millis(1_800_000),
            on_progress: None,
        }
    }
}

impl fmt::Debug for WaitOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitOptions")
            .field("polling_interval", &self.polling_interval)
            .field("timeout", &self.timeout)
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}

#[derive(Debug, StructOpt)]
pub struct ApiArgs {
    /// XeOps API key
    #[structopt(short = "k", long)]
    pub api_key: String,

    /// API endpoint
    #[structopt(short = "e", long, default_value = "https://xeops-scanner-97758009309.europe-west1.run.app")]
    pub endpoint: String,

    /// Log every request and response status
    #[structopt(long)]
    pub debug: bool,
}

impl ApiArgs {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(&self.endpoint, &self.api_key).with_debug(self.debug)
    }
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "xeops-scan",
    about = "XeOps Security Scanner CLI for CI/CD pipelines"
)]
pub enum Command {
    /// Start a security scan
    Scan(ScanArgs),
    /// Check scan status
    Status(StatusArgs),
    /// Download scan report
    Report(ReportArgs),
    /// Show usage statistics
    Usage(UsageArgs),
    /// Ask the service to stop a running scan
    Cancel(ScanIdArgs),
    /// List your scans
    List(ListArgs),
    /// Check that the service is up
    Health(UsageArgs),
}

impl Command {
    pub fn api(&self) -> &ApiArgs {
        match self {
            Command::Scan(args) => &args.api,
            Command::Status(args) => &args.api,
            Command::Cancel(args) => &args.api,
            Command::Report(args) => &args.api,
            Command::Usage(args) | Command::Health(args) => &args.api,
            Command::List(args) => &args.api,
        }
    }
}

#[derive(Debug, StructOpt)]
pub struct ScanArgs {
    /// Target URL to scan
    #[structopt(short, long)]
    pub url: String,

    #[structopt(flatten)]
    pub api: ApiArgs,

    /// Wait for scan to complete
    #[structopt(short, long)]
    pub wait: bool,

    /// Scan timeout in seconds
    #[structopt(long, default_value = "1800")]
    pub timeout: u64,

    /// Seconds between status polls
    #[structopt(long, default_value = "5")]
    pub polling_interval: u64,

    /// Download PDF report to path
    #[structopt(long)]
    pub pdf: Option<PathBuf>,

    /// Skip PoC validation when generating the PDF report
    #[structopt(long)]
    pub no_validate_poc: bool,

    /// Exit with code 1 if high/critical vulnerabilities found
    #[structopt(long)]
    pub fail_on_high: bool,

    /// Exit with code 1 if medium+ vulnerabilities found
    #[structopt(long)]
    pub fail_on_medium: bool,

    /// Output results as JSON
    #[structopt(long)]
    pub json: bool,
}

impl ScanArgs {
    pub fn validate(&self) -> Result<(), ScannerError> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(ScannerError::new("Target URL must start with http:// or https://"));
        }
        if self.timeout == 0 {
            return Err(ScannerError::new("Scan timeout must be at least one second"));
        }
        if self.polling_interval == 0 {
            return Err(ScannerError::new("Polling interval must be at least one second"));
        }
        Ok(())
    }
}

#[derive(Debug, StructOpt)]
pub struct StatusArgs {
    /// Scan ID
    #[structopt(short, long)]
    pub scan_id: String,

    #[structopt(flatten)]
    pub api: ApiArgs,

    /// Output as JSON
    #[structopt(long)]
    pub json: bool,
}

#[derive(Debug, StructOpt)]
pub struct ScanIdArgs {
    /// Scan ID
    #[structopt(short, long)]
    pub scan_id: String,

    #[structopt(flatten)]
    pub api: ApiArgs,
}

#[derive(Debug, StructOpt)]
pub struct ReportArgs {
    /// Scan ID
    #[structopt(short, long)]
    pub scan_id: String,

    /// Output PDF path
    #[structopt(short, long)]
    pub output: PathBuf,

    #[structopt(flatten)]
    pub api: ApiArgs,

    /// Skip PoC validation
    #[structopt(long)]
    pub no_validate_poc: bool,
}

#[derive(Debug, StructOpt)]
pub struct UsageArgs {
    #[structopt(flatten)]
    pub api: ApiArgs,
}

#[derive(Debug, StructOpt)]
pub struct ListArgs {
    #[structopt(flatten)]
    pub api: ApiArgs,

    /// Only scans in this state (queued, running, completed, failed)
    #[structopt(long)]
    pub status: Option<ScanStatus>,

    #[structopt(long)]
    pub limit: Option<u32>,

    #[structopt(long)]
    pub offset: Option<u32>,

    /// Output as JSON
    #[structopt(long)]
    pub json: bool,
}
