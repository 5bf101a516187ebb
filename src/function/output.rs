use super::{ScanResult, Severity, UsageStats};

/// Which findings should make a finished `scan --wait` exit non-zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeverityThreshold {
    pub fail_on_high: bool,
    pub fail_on_medium: bool,
}

impl SeverityThreshold {
    /// Snapshots without metadata never cross the threshold.
    pub fn is_crossed(&self, result: &ScanResult) -> bool {
        let Some(meta) = &result.metadata else {
            return false;
        };

        if self.fail_on_high && meta.count_at_least(Severity::High) > 0 {
            return true;
        }
        self.fail_on_medium && meta.count_at_least(Severity::Medium) > 0
    }

    pub fn exit_code(&self, result: &ScanResult) -> u8 {
        if self.is_crossed(result) { 1 } else { 0 }
    }
}

/// One-line status for the progress spinner.
pub fn progress_line(result: &ScanResult) -> String {
    format!(
        "Progress: {}% | {} | Vulnerabilities: {}",
        result.progress,
        result.current_test.as_deref().unwrap_or("Running..."),
        result.vulnerabilities_found
    )
}

pub fn render_results(result: &ScanResult) -> String {
    let mut out = String::new();
    out.push_str("\n=== Scan Results ===\n");
    out.push_str(&format!("Status: {}\n", result.status));
    out.push_str(&format!("Progress: {}%\n", result.progress));
    out.push_str(&format!("Vulnerabilities Found: {}\n", result.vulnerabilities_found));

    if let Some(meta) = &result.metadata {
        out.push_str("\n=== Severity Breakdown ===\n");
        out.push_str(&format!("  Critical: {}\n", meta.count(Severity::Critical)));
        out.push_str(&format!("  High: {}\n", meta.count(Severity::High)));
        out.push_str(&format!("  Medium: {}\n", meta.count(Severity::Medium)));
        out.push_str(&format!("  Low: {}\n", meta.count(Severity::Low)));
        out.push_str(&format!("  Info: {}\n", meta.count(Severity::Info)));
    }

    if let Some(duration) = result.duration.filter(|d| *d > 0) {
        out.push_str(&format!("\nDuration: {}s\n", (duration as f64 / 1000.0).round() as u64));
    }

    out
}

pub fn display_results(result: &ScanResult, json: bool) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        print!("{}", render_results(result));
    }
    Ok(())
}

pub fn display_usage(usage: &UsageStats) {
    println!("Usage Statistics:");
    println!("  Plan: {}", usage.plan);
    println!("  Scans Used: {}/{}", usage.scans_used, usage.scans_limit);
    println!("  Scans Remaining: {}", usage.scans_remaining);
}
