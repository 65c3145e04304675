use std::sync::Arc;

use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{
    app, app_with_state, paths, sample_records, ErrorBody, MockState, API_KEY, ERROR_BODY,
    OK_BODY, TRUNCATE_BY, XML_BODY,
};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn lookup_uri(query: &str) -> String {
    format!("{}?apiKey={API_KEY}&{query}", paths::LOOKUP)
}

// --- lookup ---

#[tokio::test]
async fn lookup_first_page() {
    let app = app_with_state(Arc::new(MockState::new(sample_records(7), 3)));
    let resp = app.oneshot(get(&lookup_uri("ip=8.8.8.8"))).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let page: serde_json::Value = body_json(resp).await;
    assert_eq!(page["current_page"], "0");
    assert_eq!(page["size"], 3);
    assert_eq!(page["result"][0]["name"], "domain0000.example");
    assert_eq!(page["result"][2]["name"], "domain0002.example");
}

#[tokio::test]
async fn lookup_pages_after_cursor() {
    let app = app_with_state(Arc::new(MockState::new(sample_records(7), 3)));
    let resp = app
        .oneshot(get(&lookup_uri("ip=8.8.8.8&from=domain0005.example")))
        .await
        .unwrap();

    let page: serde_json::Value = body_json(resp).await;
    assert_eq!(page["current_page"], "domain0005.example");
    assert_eq!(page["size"], 1);
    assert_eq!(page["result"][0]["name"], "domain0006.example");
}

#[tokio::test]
async fn lookup_xml_output() {
    let resp = app()
        .oneshot(get(&lookup_uri("ip=1.1.1.1&outputFormat=XML")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/xml");
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<?xml"));
    assert!(std::str::from_utf8(&body).unwrap().contains("<size>300</size>"));
}

#[tokio::test]
async fn lookup_rejects_wrong_api_key() {
    let resp = app()
        .oneshot(get("/api/v1?apiKey=nope&ip=8.8.8.8"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.code, 403);
    assert!(err.messages.starts_with("Access restricted."));
}

#[tokio::test]
async fn lookup_requires_ip() {
    let resp = app().oneshot(get(&lookup_uri("ip="))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let err: ErrorBody = body_json(resp).await;
    assert_eq!(err.messages, "Field 'ip' is required.");
}

#[tokio::test]
async fn lookup_rejects_malformed_ip() {
    let resp = app().oneshot(get(&lookup_uri("ip=8.8.8"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

// --- fixtures ---

#[tokio::test]
async fn fixture_ok_serves_three_records() {
    let resp = app().oneshot(get(paths::OK)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, OK_BODY.as_bytes());
}

#[tokio::test]
async fn fixture_error_is_499_envelope() {
    let resp = app().oneshot(get(paths::ERROR)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 499);
    assert_eq!(body_bytes(resp).await, ERROR_BODY.as_bytes());
}

#[tokio::test]
async fn fixture_server_error_is_xml() {
    let resp = app().oneshot(get(paths::SERVER_ERROR)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_bytes(resp).await, XML_BODY.as_bytes());
}

#[tokio::test]
async fn fixture_partial_is_short_but_consistent() {
    let resp = app().oneshot(get(paths::PARTIAL)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_bytes(resp).await;
    assert_eq!(body.len(), OK_BODY.len() - TRUNCATE_BY);
    assert!(OK_BODY.as_bytes().starts_with(&body));
}

#[tokio::test]
async fn fixture_partial_with_length_announces_full_size() {
    let resp = app().oneshot(get(paths::PARTIAL_WITH_LENGTH)).await.unwrap();
    assert_eq!(
        resp.headers()[header::CONTENT_LENGTH],
        OK_BODY.len().to_string().as_str()
    );
    assert!(resp.into_body().collect().await.is_err());
}

#[tokio::test]
async fn fixture_chunked_streams_ok_body_without_length() {
    let resp = app().oneshot(get(paths::CHUNKED)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::CONTENT_LENGTH).is_none());
    assert_eq!(body_bytes(resp).await, OK_BODY.as_bytes());
}

#[tokio::test]
async fn fixture_chunked_broken_fails_mid_stream() {
    let resp = app().oneshot(get(paths::CHUNKED_BROKEN)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::CONTENT_LENGTH).is_none());
    assert!(resp.into_body().collect().await.is_err());
}

#[tokio::test]
async fn fixture_unparsable_is_200_xml() {
    let resp = app().oneshot(get(paths::UNPARSABLE)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_bytes(resp).await, XML_BODY.as_bytes());
}

#[tokio::test]
async fn unknown_path_is_404() {
    let resp = app().oneshot(get("/ReverseIP/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- hit counter ---

#[tokio::test]
async fn every_request_is_counted() {
    use tower::Service;

    let state = Arc::new(MockState::default());
    let mut app = app_with_state(state.clone()).into_service();
    assert_eq!(state.hits(), 0);

    for path in [paths::OK, paths::ERROR, paths::UNPARSABLE] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(get(path))
            .await
            .unwrap();
        let _ = body_bytes(resp).await;
    }

    assert_eq!(state.hits(), 3);
}
