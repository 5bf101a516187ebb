mod common;

use common::{client, spawn, Script};
use serde_json::json;
use std::time::{Duration, Instant};
use xeops_scan::function::{ScanStatus, WaitOptions};

fn fast<'a>(timeout_ms: u64) -> WaitOptions<'a> {
    WaitOptions::default()
        .with_polling_interval(Duration::from_millis(10))
        .with_timeout(Duration::from_millis(timeout_ms))
}

#[tokio::test]
async fn completes_after_queued_and_running_snapshots() {
    let script = Script::new(vec![
        json!({"status": "queued", "progress": 0}),
        json!({"status": "running", "progress": 40, "currentTest": "XSS payloads", "vulnerabilitiesFound": 2}),
        json!({
            "status": "completed",
            "progress": 100,
            "vulnerabilitiesFound": 5,
            "metadata": {"criticalCount": 1, "highCount": 0, "mediumCount": 2, "lowCount": 2, "infoCount": 0}
        }),
    ]);
    let client = client(&spawn(script.router()).await);

    let mut seen = Vec::new();
    let options = fast(5000).on_progress(|r| seen.push((r.status, r.progress)));
    let result = client
        .wait_for_scan_completion("scan-1", options)
        .await
        .expect("scan completes");

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(result.vulnerabilities_found, 5);
    assert_eq!(result.metadata.unwrap().critical_count, Some(1));
    assert_eq!(script.polls(), 3);
    assert_eq!(
        seen,
        vec![
            (ScanStatus::Queued, 0),
            (ScanStatus::Running, 40),
            (ScanStatus::Completed, 100),
        ]
    );
}

#[tokio::test]
async fn no_poll_after_completed() {
    let script = Script::new(vec![json!({"status": "completed", "progress": 100})]);
    let client = client(&spawn(script.router()).await);

    client
        .wait_for_scan_completion("scan-1", fast(5000))
        .await
        .expect("scan completes");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(script.polls(), 1);
}

#[tokio::test]
async fn failed_snapshot_ends_loop_with_remote_error() {
    let script = Script::new(vec![
        json!({"status": "running", "progress": 20}),
        json!({"status": "failed", "progress": 20, "error": "target unreachable"}),
    ]);
    let client = client(&spawn(script.router()).await);

    let mut calls = 0;
    let err = client
        .wait_for_scan_completion("scan-9", fast(5000).on_progress(|_| calls += 1))
        .await
        .expect_err("scan fails");

    assert!(err.is_scan_failed());
    assert_eq!(err.status_code, None);
    assert_eq!(
        err.details,
        Some(json!({"scanId": "scan-9", "error": "target unreachable"}))
    );
    assert_eq!(calls, 2);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(script.polls(), 2);
}

#[tokio::test]
async fn never_terminal_scan_times_out() {
    let script = Script::new(vec![json!({"status": "running", "progress": 10})]);
    let client = client(&spawn(script.router()).await);

    let started = Instant::now();
    let err = client
        .wait_for_scan_completion("scan-1", fast(50))
        .await
        .expect_err("times out");

    assert!(err.is_timeout());
    assert_eq!(err.status_code, None);
    assert_eq!(err.details, Some(json!({"scanId": "scan-1", "timeout": 50})));
    assert!(started.elapsed() < Duration::from_secs(1));

    let polls = script.polls();
    assert!(polls >= 1);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(script.polls(), polls);
}

#[tokio::test]
async fn unrecognized_status_keeps_polling() {
    let script = Script::new(vec![
        json!({"status": "paused", "progress": 30}),
        json!({"status": "completed", "progress": 100}),
    ]);
    let client = client(&spawn(script.router()).await);

    let result = client
        .wait_for_scan_completion("scan-1", fast(5000))
        .await
        .expect("scan completes");

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(script.polls(), 2);
}

#[tokio::test]
async fn poll_error_propagates_unchanged() {
    let app = axum::Router::new().route(
        "/api/scans/{id}",
        axum::routing::get(|| async {
            (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({"message": "database unavailable"})),
            )
        }),
    );
    let client = client(&spawn(app).await);

    let err = client
        .wait_for_scan_completion("scan-1", fast(5000))
        .await
        .expect_err("poll fails");

    assert_eq!(err.message, "database unavailable");
    assert_eq!(err.status_code, Some(500));
}

#[tokio::test]
async fn independent_loops_share_one_client() {
    let script = Script::new(vec![
        json!({"status": "running", "progress": 50}),
        json!({"status": "running", "progress": 50}),
        json!({"status": "completed", "progress": 100}),
    ]);
    let client = client(&spawn(script.router()).await);

    let (a, b) = tokio::join!(
        client.wait_for_scan_completion("scan-a", fast(5000)),
        client.wait_for_scan_completion("scan-b", fast(5000)),
    );

    assert_eq!(a.expect("a completes").id, "scan-a");
    assert_eq!(b.expect("b completes").id, "scan-b");
}

#[tokio::test]
async fn timestamps_without_timezone_do_not_break_polling() {
    let script = Script::new(vec![
        json!({"status": "running", "progress": 10, "startedAt": "2024-05-01T10:00:00.123456"}),
        json!({
            "status": "completed",
            "progress": 100,
            "startedAt": "2024-05-01T10:00:00.123456",
            "completedAt": "2024-05-01 10:04:59+02:00"
        }),
    ]);
    let client = client(&spawn(script.router()).await);

    let result = client
        .wait_for_scan_completion("scan-1", fast(5000))
        .await
        .expect("scan completes");

    assert_eq!(script.polls(), 2);
    assert_eq!(result.started_at.as_deref(), Some("2024-05-01T10:00:00.123456"));
    assert_eq!(result.completed_at.as_deref(), Some("2024-05-01 10:04:59+02:00"));
}

#[tokio::test]
async fn zero_budget_still_polls_once() {
    let script = Script::new(vec![json!({"status": "completed", "progress": 100})]);
    let client = client(&spawn(script.router()).await);

    let result = client
        .wait_for_scan_completion("scan-1", fast(0))
        .await
        .expect("first poll happens");

    assert_eq!(result.status, ScanStatus::Completed);
    assert_eq!(script.polls(), 1);
}
