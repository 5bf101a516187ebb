// scanner.rs
use super::transport::Transport;
use super::{
    ClientConfig, HealthStatus, ListScansParams, ScanRequest, ScanResponse, ScanResult,
    ScanStatus, ScannerError, UsageStats, WaitOptions,
};
use tokio::time::{sleep, Instant};
use tracing::debug;

/// Client for the remote scanning service.
///
/// Holds no mutable state: the same client can drive any number of
/// concurrent [`wait_for_scan_completion`](Self::wait_for_scan_completion)
/// loops, which share the transport's connection pool.
#[derive(Debug, Clone)]
pub struct ScannerClient {
    transport: Transport,
}

/// Shorthand for [`ScannerClient::new`].
pub fn create_client(config: ClientConfig) -> Result<ScannerClient, ScannerError> {
    ScannerClient::new(config)
}

impl ScannerClient {
    pub fn new(config: ClientConfig) -> Result<Self, ScannerError> {
        let transport = Transport::new(&config)?;
        Ok(ScannerClient { transport })
    }

    pub async fn start_scan(&self, request: &ScanRequest) -> Result<ScanResponse, ScannerError> {
        self.transport
            .post_json("/api/scans", request)
            .await
            .map_err(|e| ScannerError::wrap("Failed to start scan", e))
    }

    pub async fn get_scan_result(&self, scan_id: &str) -> Result<ScanResult, ScannerError> {
        self.transport
            .get_json(&format!("/api/scans/{}", scan_id))
            .await
            .map_err(|e| ScannerError::wrap("Failed to get scan result", e))
    }

    /// Polls until the scan reaches a terminal state.
    ///
    /// The elapsed budget is checked before every poll, so once `timeout` has
    /// passed no further request is made. A single slow poll can still overrun
    /// the budget by one call's latency. `on_progress` sees every snapshot,
    /// including the final one, before it is acted on.
    ///
    /// Resolves with the first `completed` snapshot; a `failed` snapshot
    /// becomes a "Scan failed" error carrying the remote error text.
    pub async fn wait_for_scan_completion(
        &self,
        scan_id: &str,
        options: WaitOptions<'_>,
    ) -> Result<ScanResult, ScannerError> {
        let WaitOptions {
            polling_interval,
            timeout,
            mut on_progress,
        } = options;

        let start = Instant::now();

        loop {
            // Whole milliseconds, so a zero budget still gets one poll.
            if start.elapsed().as_millis() > timeout.as_millis() {
                return Err(ScannerError::timeout(scan_id, timeout));
            }

            let result = self.get_scan_result(scan_id).await?;
            debug!(
                scan_id,
                status = %result.status,
                progress = result.progress,
                "polled scan"
            );

            if let Some(callback) = on_progress.as_mut() {
                callback(&result);
            }

            if result.status.is_terminal() {
                if result.status == ScanStatus::Completed {
                    return Ok(result);
                }
                return Err(ScannerError::scan_failed(scan_id, result.error.as_deref()));
            }

            sleep(polling_interval).await;
        }
    }

    pub async fn download_pdf_report(
        &self,
        scan_id: &str,
        validate_poc: bool,
    ) -> Result<Vec<u8>, ScannerError> {
        self.transport
            .get_bytes_with_query(
                &format!("/api/scans/{}/report/pdf", scan_id),
                &[("validate_poc", validate_poc)],
            )
            .await
            .map_err(|e| ScannerError::wrap("Failed to download PDF report", e))
    }

    pub async fn get_usage(&self) -> Result<UsageStats, ScannerError> {
        self.transport
            .get_json("/api/users/usage")
            .await
            .map_err(|e| ScannerError::wrap("Failed to get usage stats", e))
    }

    /// `true` on a 2xx from the verify endpoint, `false` on any failure.
    pub async fn verify_api_key(&self) -> bool {
        match self.transport.get_empty("/api/auth/verify").await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "API key verification failed");
                false
            }
        }
    }

    pub async fn health_check(&self) -> Result<HealthStatus, ScannerError> {
        self.transport
            .get_json("/health")
            .await
            .map_err(|e| ScannerError::wrap("Health check failed", e))
    }

    /// Asks the service to abort the scan. Has no effect on local poll loops.
    pub async fn cancel_scan(&self, scan_id: &str) -> Result<(), ScannerError> {
        self.transport
            .post_empty(&format!("/api/scans/{}/cancel", scan_id))
            .await
            .map_err(|e| ScannerError::wrap("Failed to cancel scan", e))
    }

    /// Scans in server order.
    pub async fn list_scans(
        &self,
        params: &ListScansParams,
    ) -> Result<Vec<ScanResult>, ScannerError> {
        self.transport
            .get_json_with_query("/api/scans", params)
            .await
            .map_err(|e| ScannerError::wrap("Failed to list scans", e))
    }
}
