use std::{
    io,
    net::IpAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use axum::{
    body::{Body, Bytes},
    extract::{Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::debug;

/// The only API key `/api/v1` accepts.
pub const API_KEY: &str = "at_LoremIpsumDolorSitAmetConsect";

pub const OK_BODY: &str = r#"{"current_page":"0","size":3,"result":[{"name":"iana.com","first_seen":1570492800,
"last_visit":1657756800},{"name":"iana.net","first_seen":1571097600,"last_visit":1660780800},
{"name":"iana.org","first_seen":1570147200,"last_visit":1657843200}]}"#;

pub const XML_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?><>"#;

pub const ERROR_BODY: &str = r#"{"code":499,"messages":"Test error message."}"#;

/// Bytes cut from the end of `OK_BODY` by the partial fixtures.
pub const TRUNCATE_BY: usize = 10;

/// Fixture routes, each reproducing one response condition.
pub mod paths {
    pub const LOOKUP: &str = "/api/v1";
    pub const OK: &str = "/ReverseIP/ok";
    pub const ERROR: &str = "/ReverseIP/error";
    pub const SERVER_ERROR: &str = "/ReverseIP/500";
    pub const PARTIAL: &str = "/ReverseIP/partial";
    pub const PARTIAL_WITH_LENGTH: &str = "/ReverseIP/partial2";
    pub const UNPARSABLE: &str = "/ReverseIP/unparsable";
    pub const CHUNKED: &str = "/ReverseIP/chunked";
    pub const CHUNKED_BROKEN: &str = "/ReverseIP/chunked-broken";
    pub const SLOW: &str = "/ReverseIP/slow";
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Record {
    pub name: String,
    pub first_seen: i64,
    pub last_visit: i64,
}

#[derive(Serialize)]
struct Page<'a> {
    current_page: &'a str,
    size: usize,
    result: &'a [Record],
}

#[derive(Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub messages: String,
}

#[derive(Deserialize)]
pub struct LookupQuery {
    #[serde(rename = "apiKey")]
    pub api_key: Option<String>,
    pub ip: Option<String>,
    #[serde(rename = "outputFormat")]
    pub output_format: Option<String>,
    pub from: Option<String>,
}

/// Records served for every IP, paged by name, plus a request counter.
#[derive(Debug)]
pub struct MockState {
    hits: AtomicUsize,
    records: Vec<Record>,
    page_limit: usize,
}

impl MockState {
    pub fn new(mut records: Vec<Record>, page_limit: usize) -> Self {
        records.sort_by(|a, b| a.name.cmp(&b.name));
        Self {
            hits: AtomicUsize::new(0),
            records,
            page_limit,
        }
    }

    /// Number of requests served so far, on any route.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

impl Default for MockState {
    fn default() -> Self {
        Self::new(sample_records(650), 300)
    }
}

pub type Db = Arc<MockState>;

/// `count` deterministic records named `domain0000.example` upwards.
pub fn sample_records(count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| {
            let first_seen = 1_570_000_000 + i as i64 * 86_400;
            Record {
                name: format!("domain{i:04}.example"),
                first_seen,
                last_visit: first_seen + 90 * 86_400,
            }
        })
        .collect()
}

pub fn app() -> Router {
    app_with_state(Arc::new(MockState::default()))
}

pub fn app_with_state(db: Db) -> Router {
    Router::new()
        .route(paths::LOOKUP, get(lookup))
        .route(paths::OK, get(fixture_ok))
        .route(paths::ERROR, get(fixture_error))
        .route(paths::SERVER_ERROR, get(fixture_server_error))
        .route(paths::PARTIAL, get(fixture_partial))
        .route(paths::PARTIAL_WITH_LENGTH, get(fixture_partial_with_length))
        .route(paths::UNPARSABLE, get(fixture_unparsable))
        .route(paths::CHUNKED, get(fixture_chunked))
        .route(paths::CHUNKED_BROKEN, get(fixture_chunked_broken))
        .route(paths::SLOW, get(fixture_slow))
        .layer(middleware::from_fn_with_state(db.clone(), count_hits))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(db)).await
}

async fn count_hits(State(db): State<Db>, request: Request, next: Next) -> Response {
    db.hits.fetch_add(1, Ordering::SeqCst);
    debug!(path = %request.uri().path(), "serving");
    next.run(request).await
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        messages: message.to_string(),
    };
    (status, Json(body)).into_response()
}

async fn lookup(State(db): State<Db>, Query(query): Query<LookupQuery>) -> Response {
    if query.api_key.as_deref() != Some(API_KEY) {
        return error_response(
            StatusCode::FORBIDDEN,
            "Access restricted. Check credits balance or enter the correct API key.",
        );
    }

    let Some(ip) = query.ip.filter(|ip| !ip.is_empty()) else {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Field 'ip' is required.");
    };
    if ip.parse::<IpAddr>().is_err() {
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "Invalid IP address.");
    }

    let from = query.from.unwrap_or_default();
    let result: Vec<Record> = db
        .records
        .iter()
        .filter(|r| r.name > from)
        .take(db.page_limit)
        .cloned()
        .collect();
    let page = Page {
        current_page: if from.is_empty() { "0" } else { from.as_str() },
        size: result.len(),
        result: &result,
    };

    let xml = query
        .output_format
        .is_some_and(|f| f.eq_ignore_ascii_case("XML"));
    if xml {
        return ([(header::CONTENT_TYPE, "application/xml")], render_xml(&page)).into_response();
    }
    Json(page).into_response()
}

fn render_xml(page: &Page<'_>) -> String {
    let mut out = String::from(r#"<?xml version="1.0" encoding="utf-8"?><response>"#);
    out.push_str(&format!(
        "<current_page>{}</current_page><size>{}</size><result>",
        escape_xml(page.current_page),
        page.size
    ));
    for r in page.result {
        out.push_str(&format!(
            "<item><name>{}</name><first_seen>{}</first_seen><last_visit>{}</last_visit></item>",
            escape_xml(&r.name),
            r.first_seen,
            r.last_visit
        ));
    }
    out.push_str("</result></response>");
    out
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

async fn fixture_ok() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], OK_BODY)
}

async fn fixture_error() -> impl IntoResponse {
    let status = StatusCode::from_u16(499).unwrap_or(StatusCode::BAD_REQUEST);
    (status, [(header::CONTENT_TYPE, "application/json")], ERROR_BODY)
}

async fn fixture_server_error() -> impl IntoResponse {
    (StatusCode::INTERNAL_SERVER_ERROR, XML_BODY)
}

/// Short body with a matching Content-Length: well-formed HTTP, broken JSON.
async fn fixture_partial() -> impl IntoResponse {
    &OK_BODY[..OK_BODY.len() - TRUNCATE_BY]
}

/// Announces the full length, sends less, then drops the connection.
async fn fixture_partial_with_length() -> impl IntoResponse {
    let head = Bytes::from_static(&OK_BODY.as_bytes()[..OK_BODY.len() - TRUNCATE_BY]);
    let body = stream::once(async move { Ok::<Bytes, io::Error>(head) }).chain(stream::once(
        async {
            // Let the head reach the client before the connection is dropped.
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<Bytes, io::Error>(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "fixture body cut short",
            ))
        },
    ));
    (
        [(header::CONTENT_LENGTH, OK_BODY.len().to_string())],
        Body::from_stream(body),
    )
}

/// `OK_BODY` in two chunks with no Content-Length.
async fn fixture_chunked() -> impl IntoResponse {
    let (head, tail) = OK_BODY.as_bytes().split_at(OK_BODY.len() / 2);
    let chunks = [Bytes::from_static(head), Bytes::from_static(tail)];
    let body = stream::iter(chunks.into_iter().map(Ok::<Bytes, io::Error>));
    Body::from_stream(body)
}

/// Chunked body that stops before its terminating chunk.
async fn fixture_chunked_broken() -> impl IntoResponse {
    let head = Bytes::from_static(&OK_BODY.as_bytes()[..OK_BODY.len() - TRUNCATE_BY]);
    let body = stream::once(async move { Ok::<Bytes, io::Error>(head) }).chain(stream::once(
        async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err::<Bytes, io::Error>(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "fixture stream reset",
            ))
        },
    ));
    Body::from_stream(body)
}

async fn fixture_unparsable() -> impl IntoResponse {
    XML_BODY
}

async fn fixture_slow() -> impl IntoResponse {
    tokio::time::sleep(Duration::from_secs(10)).await;
    OK_BODY
}
