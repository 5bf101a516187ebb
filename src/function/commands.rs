use super::config::{ListArgs, ReportArgs, ScanArgs, ScanIdArgs, StatusArgs, UsageArgs};
use super::output::{display_results, display_usage, progress_line, SeverityThreshold};
use super::{Command, ListScansParams, ScanRequest, ScannerClient, WaitOptions};
use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::info;

pub async fn run(command: Command) -> Result<ExitCode> {
    let client = ScannerClient::new(command.api().client_config())?;

    match command {
        Command::Scan(args) => run_scan(&client, args).await,
        Command::Status(args) => run_status(&client, args).await,
        Command::Report(args) => run_report(&client, args).await,
        Command::Usage(args) => run_usage(&client, args).await,
        Command::Cancel(args) => run_cancel(&client, args).await,
        Command::List(args) => run_list(&client, args).await,
        Command::Health(args) => run_health(&client, args).await,
    }
}

async fn run_scan(client: &ScannerClient, args: ScanArgs) -> Result<ExitCode> {
    args.validate()?;

    let spinner = new_spinner("Verifying API key...")?;
    if !client.verify_api_key().await {
        spinner.abandon_with_message("Invalid API key");
        return Ok(ExitCode::FAILURE);
    }
    spinner.set_message("Starting security scan...");

    let request = ScanRequest::new(&args.url)?;
    let response = match client.start_scan(&request).await {
        Ok(response) => response,
        Err(e) => {
            spinner.abandon_with_message("Failed to start scan");
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!("Scan started: {}", response.scan_id));
    info!(scan_id = %response.scan_id, target = %args.url, "scan submitted");

    println!("Scan ID: {}", response.scan_id);
    println!("Target: {}", args.url);
    println!("Submitted at: {}", Local::now().format("%Y-%m-%d %H:%M:%S"));

    if !args.wait {
        println!("\nScan queued successfully!");
        println!("Use --wait flag to wait for completion");
        println!("Or check status with: xeops-scan status -s {} -k <key>", response.scan_id);
        return Ok(ExitCode::SUCCESS);
    }

    println!("\nWaiting for scan to complete...\n");
    let progress = new_spinner("Initializing...")?;
    let progress_handle = progress.clone();
    let options = WaitOptions::default()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_polling_interval(Duration::from_secs(args.polling_interval))
        .on_progress(move |snapshot| progress_handle.set_message(progress_line(snapshot)));

    let result = match client.wait_for_scan_completion(&response.scan_id, options).await {
        Ok(result) => result,
        Err(e) => {
            progress.abandon_with_message(e.message.clone());
            return Err(e.into());
        }
    };
    progress.finish_with_message("Scan completed");

    display_results(&result, args.json)?;

    if let Some(path) = &args.pdf {
        save_pdf(client, &response.scan_id, !args.no_validate_poc, path).await?;
    }

    let threshold = SeverityThreshold {
        fail_on_high: args.fail_on_high,
        fail_on_medium: args.fail_on_medium,
    };
    let code = threshold.exit_code(&result);
    if code != 0 {
        println!("\nExiting with code {} due to vulnerability severity threshold", code);
    }
    Ok(ExitCode::from(code))
}

async fn run_status(client: &ScannerClient, args: StatusArgs) -> Result<ExitCode> {
    let result = client.get_scan_result(&args.scan_id).await?;
    display_results(&result, args.json)?;
    Ok(ExitCode::SUCCESS)
}

async fn run_report(client: &ScannerClient, args: ReportArgs) -> Result<ExitCode> {
    save_pdf(client, &args.scan_id, !args.no_validate_poc, &args.output).await?;
    Ok(ExitCode::SUCCESS)
}

async fn run_usage(client: &ScannerClient, _args: UsageArgs) -> Result<ExitCode> {
    let usage = client.get_usage().await?;
    display_usage(&usage);
    Ok(ExitCode::SUCCESS)
}

async fn run_cancel(client: &ScannerClient, args: ScanIdArgs) -> Result<ExitCode> {
    client.cancel_scan(&args.scan_id).await?;
    println!("Cancellation requested for scan {}", args.scan_id);
    Ok(ExitCode::SUCCESS)
}

async fn run_list(client: &ScannerClient, args: ListArgs) -> Result<ExitCode> {
    let params = ListScansParams {
        status: args.status,
        limit: args.limit,
        offset: args.offset,
    };
    let scans = client.list_scans(&params).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&scans)?);
        return Ok(ExitCode::SUCCESS);
    }

    if scans.is_empty() {
        println!("No scans found");
    }
    for scan in &scans {
        println!(
            "{}  {:<9}  {:>3}%  {:>3} vulns  {}",
            scan.id, scan.status, scan.progress, scan.vulnerabilities_found, scan.target_url
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_health(client: &ScannerClient, _args: UsageArgs) -> Result<ExitCode> {
    let health = client.health_check().await?;
    println!("Status: {}", health.status);
    println!("Version: {}", health.version);
    Ok(ExitCode::SUCCESS)
}

async fn save_pdf(
    client: &ScannerClient,
    scan_id: &str,
    validate_poc: bool,
    path: &Path,
) -> Result<()> {
    let spinner = new_spinner("Generating PDF report...")?;
    let pdf = match client.download_pdf_report(scan_id, validate_poc).await {
        Ok(pdf) => pdf,
        Err(e) => {
            spinner.abandon_with_message("PDF report failed");
            return Err(e.into());
        }
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    tokio::fs::write(path, &pdf)
        .await
        .with_context(|| format!("Failed to write report file: {}", path.display()))?;

    spinner.finish_with_message(format!("PDF report saved to: {}", path.display()));
    Ok(())
}

fn new_spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(message.to_string());
    Ok(pb)
}
