#![allow(dead_code)]

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::Json;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xeops_scan::{ClientConfig, ScannerClient};

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    format!("http://{}", addr)
}

/// A base URL nobody listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

pub fn client(base_url: &str) -> ScannerClient {
    ScannerClient::new(
        ClientConfig::new(base_url, "test-key").with_timeout(Duration::from_secs(5)),
    )
    .expect("client")
}

/// Scan snapshots handed out one per poll; the last one repeats forever.
#[derive(Clone, Default)]
pub struct Script {
    queue: Arc<Mutex<VecDeque<Value>>>,
    last: Arc<Mutex<Option<Value>>>,
    polls: Arc<AtomicUsize>,
}

impl Script {
    pub fn new(snapshots: Vec<Value>) -> Self {
        Script {
            queue: Arc::new(Mutex::new(snapshots.into())),
            ..Default::default()
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn next(&self) -> Value {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(next) = self.queue.lock().unwrap().pop_front() {
            *last = Some(next);
        }
        last.clone().expect("script has at least one snapshot")
    }

    pub fn router(&self) -> Router {
        Router::new()
            .route("/api/scans/{id}", axum::routing::get(scripted_snapshot))
            .with_state(self.clone())
    }
}

async fn scripted_snapshot(State(script): State<Script>, Path(id): Path<String>) -> Json<Value> {
    let mut snapshot = script.next();
    if let Some(obj) = snapshot.as_object_mut() {
        obj.entry("id").or_insert(Value::String(id));
    }
    Json(snapshot)
}

/// What the mock saw for one request.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: String,
}

#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn record(&self, method: Method, uri: &Uri, headers: HeaderMap, body: String) {
        self.calls.lock().unwrap().push(Recorded {
            method,
            path: uri.path().to_string(),
            query: uri.query().map(str::to_string),
            headers,
            body,
        });
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }
}

/// Answers every request with the same canned response and records it.
pub fn canned(recorder: Recorder, status: StatusCode, content_type: &'static str, body: Vec<u8>) -> Router {
    Router::new().fallback(
        move |method: Method, uri: Uri, headers: HeaderMap, request_body: String| {
            let recorder = recorder.clone();
            let body = body.clone();
            async move {
                recorder.record(method, &uri, headers, request_body);
                (status, [(header::CONTENT_TYPE, content_type)], body)
            }
        },
    )
}

pub fn canned_json(recorder: Recorder, status: StatusCode, body: Value) -> Router {
    canned(recorder, status, "application/json", body.to_string().into_bytes())
}

/// Sends a 200 status line promising more body than it delivers, then hangs up.
pub async fn truncated_body_url() -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let _ = socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: 512\r\n\r\n{\"plan\":",
                )
                .await;
            let _ = socket.shutdown().await;
        }
    });
    format!("http://{}", addr)
}
