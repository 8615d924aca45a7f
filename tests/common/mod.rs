//! Test support: an in-process mock of the API plus recording doubles for
//! the progress reporter and the connection-error handler.
//!
//! The server runs on its own thread with a current-thread tokio runtime so
//! the blocking client under test never executes inside an async context.

#![allow(dead_code)]

use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use deciphon_cli::progress::{ProgressDisplay, ProgressReporter};
use deciphon_cli::translate::ConnectionErrorHandler;
use deciphon_cli::{ApiClient, ConnectivityError, Settings};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const API_KEY: &str = "test-key-0123";

/// Body served by `/files/db`.
pub fn db_bytes() -> Vec<u8> {
    (0..1000u32).map(|i| (i * 7 % 256) as u8).collect()
}

/// What the server saw for one request.
#[derive(Debug, Clone)]
pub struct Received {
    pub path: String,
    pub api_key: Option<String>,
    pub accept: Option<String>,
    pub content_type: Option<String>,
}

#[derive(Clone, Default)]
pub struct RequestLog(Arc<Mutex<Vec<Received>>>);

impl RequestLog {
    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        let value = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        self.0.lock().unwrap().push(Received {
            path: uri.path().to_string(),
            api_key: value("x-api-key"),
            accept: value("accept"),
            content_type: value("content-type"),
        });
    }

    pub fn all(&self) -> Vec<Received> {
        self.0.lock().unwrap().clone()
    }
}

#[derive(Serialize)]
struct UploadSummary {
    field: String,
    file_name: Option<String>,
    content_type: Option<String>,
    size: usize,
    checksum: u64,
}

async fn get_json(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    log.record(&uri, &headers);
    Json(json!({"id": 3, "name": "pfam", "tags": ["hmm", "db"]}))
}

async fn get_plain(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> &'static str {
    log.record(&uri, &headers);
    "ACGT\nTTGA\n"
}

async fn not_json(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> &'static str {
    log.record(&uri, &headers);
    "<html>bad gateway</html>"
}

async fn echo(
    State(log): State<RequestLog>,
    uri: Uri,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    log.record(&uri, &headers);
    (StatusCode::CREATED, Json(json!({"received": body})))
}

async fn remove(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    log.record(&uri, &headers);
    Json(json!({"deleted": uri.path()}))
}

async fn upload(
    State(log): State<RequestLog>,
    uri: Uri,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Json<Vec<UploadSummary>> {
    log.record(&uri, &headers);
    let mut fields = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await.unwrap();
        fields.push(UploadSummary {
            field: name,
            file_name,
            content_type,
            size: data.len(),
            checksum: data.iter().map(|&b| b as u64).sum(),
        });
    }
    Json(fields)
}

async fn file(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    log.record(&uri, &headers);
    ([(header::CONTENT_TYPE, "application/octet-stream")], db_bytes())
}

/// Body sent with chunked encoding, so the response has no Content-Length.
async fn streamed(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> Body {
    log.record(&uri, &headers);
    let parts: Vec<Result<Vec<u8>, std::io::Error>> =
        vec![Ok(b"hello".to_vec()), Ok(b" world".to_vec())];
    Body::from_stream(futures_util::stream::iter(parts))
}

async fn missing(State(log): State<RequestLog>, uri: Uri, headers: HeaderMap) -> impl IntoResponse {
    log.record(&uri, &headers);
    (StatusCode::NOT_FOUND, "no such file")
}

fn router(log: RequestLog) -> Router {
    Router::new()
        .route("/json", get(get_json))
        .route("/plain", get(get_plain))
        .route("/not-json", get(not_json))
        .route("/echo", post(echo))
        .route("/items/{id}", delete(remove))
        .route("/upload", post(upload))
        .route("/files/db", get(file))
        .route("/files/stream", get(streamed))
        .route("/files/missing", get(missing))
        .with_state(log)
}

pub struct MockServer {
    pub url: String,
    pub log: RequestLog,
}

/// Start the mock API on a random local port.
pub fn start() -> MockServer {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    let log = RequestLog::default();
    let app = router(log.clone());
    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            axum::serve(listener, app).await.unwrap();
        })
    });

    MockServer {
        url: format!("http://{addr}"),
        log,
    }
}

/// A base URL nothing is listening on.
pub fn unreachable_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Serves one connection: reads the request, then sends `status_line` with
/// a Content-Length of 100 but only a few body bytes before closing.
pub fn truncating_server(status_line: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        let response = format!("HTTP/1.1 {status_line}\r\nContent-Length: 100\r\n\r\ncut sh");
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
    });
    format!("http://{addr}")
}

/// Read request headers and any declared body so closing the socket does
/// not reset the connection before the client sees the response.
fn read_request(stream: &mut std::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            return;
        }
        data.extend_from_slice(&buf[..n]);
        if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&data[..header_end]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .map(|v| v.trim().parse().unwrap())
        .unwrap_or(0);
    while data.len() < header_end + length {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
    }
}

/// A listener that accepts connections (via the backlog) but never answers.
/// Keep the returned listener alive for the duration of the test.
pub fn silent_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Counts connectivity failures instead of exiting.
#[derive(Clone, Default)]
pub struct CountingHandler(pub Arc<AtomicUsize>);

impl CountingHandler {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl ConnectionErrorHandler for CountingHandler {
    fn handle(&self, _err: &ConnectivityError) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Everything a transfer did to its progress display.
#[derive(Debug, Default, Clone)]
pub struct Transfer {
    pub label: String,
    pub total: Option<u64>,
    pub advances: Vec<u64>,
    pub closes: usize,
}

#[derive(Clone, Default)]
pub struct RecordingReporter(pub Arc<Mutex<Vec<Transfer>>>);

impl RecordingReporter {
    pub fn transfers(&self) -> Vec<Transfer> {
        self.0.lock().unwrap().clone()
    }
}

struct RecordingDisplay {
    transfers: Arc<Mutex<Vec<Transfer>>>,
    index: usize,
}

impl ProgressDisplay for RecordingDisplay {
    fn advance(&self, delta: u64) {
        self.transfers.lock().unwrap()[self.index].advances.push(delta);
    }

    fn close(&self) {
        self.transfers.lock().unwrap()[self.index].closes += 1;
    }
}

impl ProgressReporter for RecordingReporter {
    fn create(&self, total: Option<u64>, label: &str) -> Box<dyn ProgressDisplay> {
        let mut transfers = self.0.lock().unwrap();
        transfers.push(Transfer {
            label: label.to_string(),
            total,
            ..Transfer::default()
        });
        Box::new(RecordingDisplay {
            transfers: self.0.clone(),
            index: transfers.len() - 1,
        })
    }
}

/// Client wired to `base_url` with recording doubles.
pub fn client(base_url: &str) -> (ApiClient, CountingHandler, RecordingReporter) {
    client_with(Settings::new(base_url, API_KEY))
}

pub fn client_with(settings: Settings) -> (ApiClient, CountingHandler, RecordingReporter) {
    let handler = CountingHandler::default();
    let reporter = RecordingReporter::default();
    let api = ApiClient::new(&settings)
        .unwrap()
        .with_connection_error_handler(handler.clone())
        .with_progress_reporter(reporter.clone());
    (api, handler, reporter)
}
